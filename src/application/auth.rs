//! Account registration, login and request authentication.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::application::repos::{
    AccountRoles, CreateUserParams, RepoError, RolesRepo, UsersRepo,
};
use crate::cache::{CacheState, CallerFingerprint, InvalidationTarget, ResourceKind, WriteInterrupted};
use crate::domain::entities::{RoleId, UserId, UserRecord};
use crate::domain::error::{DomainError, require_text};
use crate::domain::permissions::{PermissionSet, ROLE_ADMIN, authorize};
use crate::infra::auth::{JwtCodec, TokenError};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer credential")]
    MissingCredential,
    #[error("invalid bearer credential")]
    InvalidCredential,
    #[error("bearer credential expired")]
    Expired,
    #[error("permission `{permission}` required")]
    Forbidden { permission: &'static str },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::Expired,
            TokenError::Invalid(_) | TokenError::Signing(_) => AuthError::InvalidCredential,
        }
    }
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("role `{0}` is not in the catalog")]
    UnknownRole(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Interrupted(#[from] WriteInterrupted),
}

#[derive(Debug, Clone, Default)]
pub struct RegisterCommand {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LoginCommand {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub user: UserRecord,
}

/// Authenticated caller with permissions resolved once per request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: UserId,
    pub name: String,
    pub fingerprint: CallerFingerprint,
    pub permissions: PermissionSet,
}

impl Principal {
    pub fn require(&self, permission: &'static str) -> Result<(), AuthError> {
        if authorize(&self.permissions, permission) {
            Ok(())
        } else {
            Err(AuthError::Forbidden { permission })
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccountPolicy {
    pub default_role: String,
    pub first_user_admin: bool,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UsersRepo>,
    roles: Arc<dyn RolesRepo>,
    tokens: Arc<JwtCodec>,
    cache: CacheState,
    policy: AccountPolicy,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        roles: Arc<dyn RolesRepo>,
        tokens: Arc<JwtCodec>,
        cache: CacheState,
        policy: AccountPolicy,
    ) -> Self {
        Self {
            users,
            roles,
            tokens,
            cache,
            policy,
        }
    }

    pub async fn register(&self, command: RegisterCommand) -> Result<UserRecord, AccountError> {
        let name = require_text(command.name, "name")?;
        let email = require_text(command.email, "email")?.to_ascii_lowercase();
        if !email.contains('@') {
            return Err(DomainError::validation("email", "must be an email address").into());
        }
        let password = command.password.unwrap_or_default();
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(
                "password",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            )
            .into());
        }

        let password_hash = hash_password(password).await?;
        let roles = AccountRoles {
            default_role: self.role_id(&self.policy.default_role).await?,
            first_user_role: if self.policy.first_user_admin {
                Some(self.role_id(ROLE_ADMIN).await?)
            } else {
                None
            },
        };
        let users = self.users.clone();

        let user = self
            .cache
            .writes
            .mutate(
                async move {
                    users
                        .create_account(
                            CreateUserParams {
                                name,
                                email,
                                password_hash,
                            },
                            roles,
                        )
                        .await
                        .map_err(AccountError::from)
                },
                |user| InvalidationTarget::item_and_collection(ResourceKind::User, user.id),
            )
            .await?;

        info!(user_id = user.id, "registered account");
        Ok(user)
    }

    async fn role_id(&self, name: &str) -> Result<RoleId, AccountError> {
        self.roles
            .find_role_by_name(name)
            .await?
            .map(|role| role.id)
            .ok_or_else(|| AccountError::UnknownRole(name.to_string()))
    }

    pub async fn login(&self, command: LoginCommand) -> Result<LoginOutcome, AccountError> {
        let email = command
            .email
            .map(|email| email.trim().to_ascii_lowercase())
            .filter(|email| !email.is_empty())
            .ok_or(AccountError::InvalidCredentials)?;
        let password = command.password.ok_or(AccountError::InvalidCredentials)?;

        let credentials = self
            .users
            .find_credentials_by_email(&email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !verify_password(password, credentials.password_hash).await? {
            return Err(AccountError::InvalidCredentials);
        }

        let user = credentials.user;
        let token = self.tokens.issue(user.id, &user.name)?;
        Ok(LoginOutcome { token, user })
    }

    /// Resolve a bearer credential into a principal.
    pub async fn authenticate(&self, credential: &str) -> Result<Principal, AuthError> {
        let claims = self.tokens.verify(credential)?;
        let user_id = claims.user_id()?;
        let user = self
            .users
            .find_user(user_id)
            .await?
            .ok_or(AuthError::InvalidCredential)?;
        let permissions = self.roles.permissions_for_user(user.id).await?;

        Ok(Principal {
            user_id: user.id,
            name: user.name,
            fingerprint: CallerFingerprint::from_credential(credential),
            permissions: PermissionSet::new(permissions),
        })
    }
}

async fn hash_password(password: String) -> Result<String, AccountError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| AccountError::Hashing(err.to_string()))
    })
    .await
    .map_err(|err| AccountError::Hashing(err.to_string()))?
}

async fn verify_password(password: String, stored: String) -> Result<bool, AccountError> {
    tokio::task::spawn_blocking(move || {
        let parsed =
            PasswordHash::new(&stored).map_err(|err| AccountError::Hashing(err.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|err| AccountError::Hashing(err.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, CacheStore, MemoryCacheStore};
    use crate::domain::permissions::{CREATE_POST, MANAGE_ROLES, ROLE_USER, VIEW_POST};
    use crate::infra::memory::InMemoryRepositories;

    fn service(first_user_admin: bool) -> (AuthService, Arc<MemoryCacheStore>) {
        let repos = Arc::new(InMemoryRepositories::new());
        let store = Arc::new(MemoryCacheStore::new());
        let cache = CacheState::new(&CacheConfig::default(), store.clone());
        let tokens = Arc::new(JwtCodec::new(
            "test-secret-test-secret-test-secret",
            "postcache",
            3600,
        ));
        let service = AuthService::new(
            repos.clone(),
            repos,
            tokens,
            cache,
            AccountPolicy {
                default_role: ROLE_USER.to_string(),
                first_user_admin,
            },
        );
        (service, store)
    }

    fn register(email: &str) -> RegisterCommand {
        RegisterCommand {
            name: Some("Ada".to_string()),
            email: Some(email.to_string()),
            password: Some("correct horse".to_string()),
        }
    }

    async fn principal_for(service: &AuthService, email: &str) -> Principal {
        let outcome = service
            .login(LoginCommand {
                email: Some(email.to_string()),
                password: Some("correct horse".to_string()),
            })
            .await
            .expect("login");
        service
            .authenticate(&outcome.token)
            .await
            .expect("authenticate")
    }

    #[tokio::test]
    async fn first_user_is_promoted_when_enabled() {
        let (service, _) = service(true);
        service.register(register("ada@example.com")).await.expect("first");
        service.register(register("bob@example.com")).await.expect("second");

        let admin = principal_for(&service, "ada@example.com").await;
        assert!(admin.require(MANAGE_ROLES).is_ok());

        let member = principal_for(&service, "bob@example.com").await;
        assert!(member.require(VIEW_POST).is_ok());
        assert!(matches!(
            member.require(CREATE_POST),
            Err(AuthError::Forbidden {
                permission: CREATE_POST
            })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn simultaneous_first_registrations_promote_one_admin() {
        let (service, _) = service(true);
        let (a, b) = tokio::join!(
            service.register(register("ada@example.com")),
            service.register(register("bob@example.com")),
        );
        a.expect("ada");
        b.expect("bob");

        let ada = principal_for(&service, "ada@example.com").await;
        let bob = principal_for(&service, "bob@example.com").await;
        let admins = [ada, bob]
            .iter()
            .filter(|principal| principal.require(MANAGE_ROLES).is_ok())
            .count();
        assert_eq!(admins, 1);
    }

    #[tokio::test]
    async fn default_role_applies_without_promotion() {
        let (service, _) = service(false);
        service.register(register("ada@example.com")).await.expect("register");
        let principal = principal_for(&service, "ada@example.com").await;
        assert!(principal.require(MANAGE_ROLES).is_err());
    }

    #[tokio::test]
    async fn registration_invalidates_user_listing() {
        let (service, store) = service(false);
        store
            .set("collection:user", "[]".to_string(), 60)
            .await
            .expect("seed");
        service.register(register("ada@example.com")).await.expect("register");
        assert!(!store.contains_key("collection:user"));
    }

    #[tokio::test]
    async fn registration_validates_input() {
        let (service, _) = service(false);
        let err = service
            .register(RegisterCommand {
                password: Some("short".to_string()),
                ..register("ada@example.com")
            })
            .await
            .expect_err("short password");
        assert!(matches!(
            err,
            AccountError::Validation(DomainError::Validation {
                field: "password",
                ..
            })
        ));

        let err = service
            .register(register("not-an-email"))
            .await
            .expect_err("bad email");
        assert!(matches!(err, AccountError::Validation(_)));
    }

    #[tokio::test]
    async fn duplicate_email_is_reported() {
        let (service, _) = service(false);
        service.register(register("ada@example.com")).await.expect("first");
        let err = service
            .register(register("ADA@example.com"))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, AccountError::Repo(RepoError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let (service, _) = service(false);
        service.register(register("ada@example.com")).await.expect("register");
        let err = service
            .login(LoginCommand {
                email: Some("ada@example.com".to_string()),
                password: Some("wrong password".to_string()),
            })
            .await
            .expect_err("wrong password");
        assert!(matches!(err, AccountError::InvalidCredentials));
    }

    #[tokio::test]
    async fn fingerprint_hides_token() {
        let (service, _) = service(false);
        service.register(register("ada@example.com")).await.expect("register");
        let outcome = service
            .login(LoginCommand {
                email: Some("ada@example.com".to_string()),
                password: Some("correct horse".to_string()),
            })
            .await
            .expect("login");
        let principal = service.authenticate(&outcome.token).await.expect("auth");
        assert_eq!(
            principal.fingerprint,
            CallerFingerprint::from_credential(&outcome.token)
        );
        assert!(!principal.fingerprint.as_str().contains(&outcome.token));
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let (service, _) = service(false);
        assert!(matches!(
            service.authenticate("garbage").await,
            Err(AuthError::InvalidCredential)
        ));
    }
}
