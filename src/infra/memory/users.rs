use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{
    AccountRoles, CreateUserParams, RepoError, UserCredentials, UsersRepo,
};
use crate::domain::entities::{UserId, UserRecord, UserWithRoles};

use super::{InMemoryRepositories, ResourceState, StoredUser};

const EMAIL_CONSTRAINT: &str = "users_email_key";

fn insert_user(
    state: &mut ResourceState,
    params: CreateUserParams,
) -> Result<UserRecord, RepoError> {
    if state
        .users
        .values()
        .any(|user| user.record.email.eq_ignore_ascii_case(&params.email))
    {
        return Err(RepoError::Duplicate {
            constraint: EMAIL_CONSTRAINT.to_string(),
        });
    }

    state.next_user_id += 1;
    let record = UserRecord {
        id: state.next_user_id,
        name: params.name,
        email: params.email,
        created_at: OffsetDateTime::now_utc(),
    };
    state.users.insert(
        record.id,
        StoredUser {
            record: record.clone(),
            password_hash: params.password_hash,
        },
    );
    Ok(record)
}

#[async_trait]
impl UsersRepo for InMemoryRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.write("create_user");
        insert_user(&mut state, params)
    }

    async fn create_account(
        &self,
        params: CreateUserParams,
        roles: AccountRoles,
    ) -> Result<UserRecord, RepoError> {
        let mut state = self.write("create_account");
        let role_id = match roles.first_user_role {
            Some(first) if state.users.is_empty() => first,
            _ => roles.default_role,
        };
        if !state.roles.contains_key(&role_id) {
            return Err(RepoError::NotFound);
        }

        let record = insert_user(&mut state, params)?;
        state.user_roles.insert((record.id, role_id));
        Ok(record)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<UserRecord>, RepoError> {
        let state = self.read("find_user");
        Ok(state.users.get(&id).map(|user| user.record.clone()))
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, RepoError> {
        let state = self.read("find_credentials_by_email");
        Ok(state
            .users
            .values()
            .find(|user| user.record.email.eq_ignore_ascii_case(email))
            .map(|user| UserCredentials {
                user: user.record.clone(),
                password_hash: user.password_hash.clone(),
            }))
    }

    async fn list_users_with_roles(&self) -> Result<Vec<UserWithRoles>, RepoError> {
        let state = self.read("list_users_with_roles");
        Ok(state
            .users
            .values()
            .map(|user| UserWithRoles {
                user: user.record.clone(),
                roles: state.role_names_for(user.record.id),
            })
            .collect())
    }
}
