//! Repository traits describing the backend resource store.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{
    PermissionRecord, PostId, PostRecord, RoleId, RoleRecord, RoleWithPermissions, UserId,
    UserRecord, UserWithRoles,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("store timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub title: String,
    pub content: String,
    pub user_id: UserId,
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Roles granted to a new account. `first_user_role` applies only when the store has no
/// users yet, decided under the same lock that inserts the account.
#[derive(Debug, Clone, Copy)]
pub struct AccountRoles {
    pub default_role: RoleId,
    pub first_user_role: Option<RoleId>,
}

/// Stored login material for a single account.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: UserRecord,
    pub password_hash: String,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// All posts, newest first.
    async fn list_posts(&self) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_post(&self, id: PostId) -> Result<Option<PostRecord>, RepoError>;

    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    /// Returns `false` when no post with `id` existed.
    async fn delete_post(&self, id: PostId) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn find_user(&self, id: UserId) -> Result<Option<UserRecord>, RepoError>;

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, RepoError>;

    /// Create a user and grant its initial role in one step.
    async fn create_account(
        &self,
        params: CreateUserParams,
        roles: AccountRoles,
    ) -> Result<UserRecord, RepoError>;

    async fn list_users_with_roles(&self) -> Result<Vec<UserWithRoles>, RepoError>;
}

#[async_trait]
pub trait RolesRepo: Send + Sync {
    async fn list_roles_with_permissions(&self) -> Result<Vec<RoleWithPermissions>, RepoError>;

    async fn find_role(&self, id: RoleId) -> Result<Option<RoleRecord>, RepoError>;

    async fn find_role_by_name(&self, name: &str) -> Result<Option<RoleRecord>, RepoError>;

    async fn find_permission_by_name(
        &self,
        name: &str,
    ) -> Result<Option<PermissionRecord>, RepoError>;

    /// Idempotent: assigning a held role is a no-op.
    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> Result<(), RepoError>;

    /// Returns `false` when the user did not hold the role.
    async fn remove_role(&self, user_id: UserId, role_id: RoleId) -> Result<bool, RepoError>;

    /// Idempotent: granting a held permission is a no-op.
    async fn assign_permission(
        &self,
        role_id: RoleId,
        permission_id: i64,
    ) -> Result<(), RepoError>;

    /// Returns `false` when the role did not hold the permission.
    async fn remove_permission(
        &self,
        role_id: RoleId,
        permission_id: i64,
    ) -> Result<bool, RepoError>;

    /// Union of permission names granted through every role of the user.
    async fn permissions_for_user(&self, user_id: UserId) -> Result<Vec<String>, RepoError>;
}
