//! User-role and role-permission management.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::auth::{AuthError, Principal};
use crate::application::repos::{RepoError, RolesRepo, UsersRepo};
use crate::cache::{CacheState, InvalidationTarget, ResourceKind, ResourceScope, WriteInterrupted};
use crate::domain::entities::{RoleId, RoleRecord, RoleWithPermissions, UserId, UserWithRoles};
use crate::domain::error::{DomainError, require_text};
use crate::domain::permissions::MANAGE_ROLES;

#[derive(Debug, Error)]
pub enum AdminServiceError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Interrupted(#[from] WriteInterrupted),
}

#[derive(Clone)]
pub struct AdminService {
    users: Arc<dyn UsersRepo>,
    roles: Arc<dyn RolesRepo>,
    cache: CacheState,
}

impl AdminService {
    pub fn new(users: Arc<dyn UsersRepo>, roles: Arc<dyn RolesRepo>, cache: CacheState) -> Self {
        Self {
            users,
            roles,
            cache,
        }
    }

    pub async fn list_users(
        &self,
        principal: &Principal,
    ) -> Result<Vec<UserWithRoles>, AdminServiceError> {
        principal.require(MANAGE_ROLES)?;
        let key = self.cache.read_key(
            ResourceKind::User,
            ResourceScope::Collection,
            &principal.fingerprint,
        );
        let users = self.users.clone();
        self.cache
            .reads
            .read_through(&key, || async move {
                users
                    .list_users_with_roles()
                    .await
                    .map_err(AdminServiceError::from)
            })
            .await
    }

    pub async fn list_roles(
        &self,
        principal: &Principal,
    ) -> Result<Vec<RoleWithPermissions>, AdminServiceError> {
        principal.require(MANAGE_ROLES)?;
        let key = self.cache.read_key(
            ResourceKind::Role,
            ResourceScope::Collection,
            &principal.fingerprint,
        );
        let roles = self.roles.clone();
        self.cache
            .reads
            .read_through(&key, || async move {
                roles
                    .list_roles_with_permissions()
                    .await
                    .map_err(AdminServiceError::from)
            })
            .await
    }

    /// Grant a role by name. Returns a confirmation message.
    pub async fn assign_role(
        &self,
        principal: &Principal,
        user_id: UserId,
        role: Option<String>,
    ) -> Result<String, AdminServiceError> {
        principal.require(MANAGE_ROLES)?;
        let role_name = require_text(role, "role")?;
        let (user_name, role) = self.resolve_user_role(user_id, &role_name).await?;

        let roles = self.roles.clone();
        self.cache
            .writes
            .mutate(
                async move {
                    roles
                        .assign_role(user_id, role.id)
                        .await
                        .map_err(AdminServiceError::from)
                },
                move |_| InvalidationTarget::item_and_collection(ResourceKind::User, user_id),
            )
            .await?;

        info!(user_id, role = %role_name, "assigned role");
        Ok(format!("Role '{role_name}' assigned to user '{user_name}'"))
    }

    /// Revoke a role by name. Revoking a role the user lacks is not an error.
    pub async fn remove_role(
        &self,
        principal: &Principal,
        user_id: UserId,
        role: String,
    ) -> Result<String, AdminServiceError> {
        principal.require(MANAGE_ROLES)?;
        let role_name = require_text(Some(role), "role")?;
        let (user_name, role) = self.resolve_user_role(user_id, &role_name).await?;

        let roles = self.roles.clone();
        let removed = self
            .cache
            .writes
            .mutate(
                async move {
                    roles
                        .remove_role(user_id, role.id)
                        .await
                        .map_err(AdminServiceError::from)
                },
                move |_| InvalidationTarget::item_and_collection(ResourceKind::User, user_id),
            )
            .await?;

        info!(user_id, role = %role_name, removed, "removed role");
        Ok(format!("Role '{role_name}' removed from user '{user_name}'"))
    }

    pub async fn assign_permission(
        &self,
        principal: &Principal,
        role_id: RoleId,
        permission: Option<String>,
    ) -> Result<String, AdminServiceError> {
        principal.require(MANAGE_ROLES)?;
        let permission_name = require_text(permission, "permission")?;
        let (role_name, permission_id) =
            self.resolve_role_permission(role_id, &permission_name).await?;

        let roles = self.roles.clone();
        self.cache
            .writes
            .mutate(
                async move {
                    roles
                        .assign_permission(role_id, permission_id)
                        .await
                        .map_err(AdminServiceError::from)
                },
                move |_| InvalidationTarget::item_and_collection(ResourceKind::Role, role_id),
            )
            .await?;

        info!(role_id, permission = %permission_name, "assigned permission");
        Ok(format!(
            "Permission '{permission_name}' assigned to role '{role_name}'"
        ))
    }

    pub async fn remove_permission(
        &self,
        principal: &Principal,
        role_id: RoleId,
        permission: String,
    ) -> Result<String, AdminServiceError> {
        principal.require(MANAGE_ROLES)?;
        let permission_name = require_text(Some(permission), "permission")?;
        let (role_name, permission_id) =
            self.resolve_role_permission(role_id, &permission_name).await?;

        let roles = self.roles.clone();
        let removed = self
            .cache
            .writes
            .mutate(
                async move {
                    roles
                        .remove_permission(role_id, permission_id)
                        .await
                        .map_err(AdminServiceError::from)
                },
                move |_| InvalidationTarget::item_and_collection(ResourceKind::Role, role_id),
            )
            .await?;

        info!(role_id, permission = %permission_name, removed, "removed permission");
        Ok(format!(
            "Permission '{permission_name}' removed from role '{role_name}'"
        ))
    }

    async fn resolve_user_role(
        &self,
        user_id: UserId,
        role_name: &str,
    ) -> Result<(String, RoleRecord), AdminServiceError> {
        let role = self
            .roles
            .find_role_by_name(role_name)
            .await?
            .ok_or_else(|| DomainError::unknown("role", role_name))?;
        let user = self
            .users
            .find_user(user_id)
            .await?
            .ok_or(AdminServiceError::NotFound { entity: "user" })?;
        Ok((user.name, role))
    }

    async fn resolve_role_permission(
        &self,
        role_id: RoleId,
        permission_name: &str,
    ) -> Result<(String, i64), AdminServiceError> {
        let permission = self
            .roles
            .find_permission_by_name(permission_name)
            .await?
            .ok_or_else(|| DomainError::unknown("permission", permission_name))?;
        let role = self
            .roles
            .find_role(role_id)
            .await?
            .ok_or(AdminServiceError::NotFound { entity: "role" })?;
        Ok((role.name, permission.id))
    }
}
