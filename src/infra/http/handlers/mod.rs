//! API handlers organized by resource type.
//!
//! Error conversions shared by the resource modules live here.

mod admin;
mod auth;
mod health;
mod posts;

pub use admin::*;
pub use auth::*;
pub use health::*;
pub use posts::*;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;

use crate::application::admin::AdminServiceError;
use crate::application::auth::{AccountError, AuthError};
use crate::application::posts::PostServiceError;
use crate::application::repos::RepoError;
use crate::cache::WriteInterrupted;
use crate::domain::error::DomainError;

use super::error::{ApiError, codes};

/// Parse a path id, accepting positive integers only.
pub(crate) fn parse_id(raw: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::bad_request(
            "Invalid id",
            Some(format!("`{raw}` is not a positive integer")),
        )),
    }
}

pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request("Malformed JSON body", Some(rejection.body_text())))
}

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Duplicate record",
            Some(constraint),
        ),
        RepoError::NotFound => ApiError::not_found("resource not found"),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::STORE_TIMEOUT,
            "Store timeout",
            None,
        ),
        RepoError::Persistence(msg) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            Some(msg),
        ),
    }
}

pub(crate) fn domain_to_api(err: DomainError) -> ApiError {
    ApiError::validation(err.to_string())
}

pub(crate) fn auth_to_api(err: AuthError) -> ApiError {
    match err {
        AuthError::Forbidden { .. } => ApiError::forbidden(err.to_string()),
        AuthError::Repo(repo) => repo_to_api(repo),
        AuthError::MissingCredential | AuthError::InvalidCredential | AuthError::Expired => {
            ApiError::unauthorized()
        }
    }
}

fn interrupted_to_api(err: WriteInterrupted) -> ApiError {
    ApiError::internal(err.to_string())
}

pub(crate) fn post_to_api(err: PostServiceError) -> ApiError {
    match err {
        PostServiceError::Auth(auth) => auth_to_api(auth),
        PostServiceError::Validation(domain) => domain_to_api(domain),
        PostServiceError::NotFound => ApiError::not_found("post not found"),
        PostServiceError::Repo(repo) => repo_to_api(repo),
        PostServiceError::Interrupted(err) => interrupted_to_api(err),
    }
}

pub(crate) fn admin_to_api(err: AdminServiceError) -> ApiError {
    match err {
        AdminServiceError::Auth(auth) => auth_to_api(auth),
        AdminServiceError::Validation(domain) => domain_to_api(domain),
        AdminServiceError::NotFound { entity: "user" } => ApiError::not_found("user not found"),
        AdminServiceError::NotFound { .. } => ApiError::not_found("role not found"),
        AdminServiceError::Repo(repo) => repo_to_api(repo),
        AdminServiceError::Interrupted(err) => interrupted_to_api(err),
    }
}

pub(crate) fn account_to_api(err: AccountError) -> ApiError {
    match err {
        AccountError::Validation(domain) => domain_to_api(domain),
        AccountError::InvalidCredentials => ApiError::new(
            StatusCode::UNAUTHORIZED,
            codes::INVALID_CREDENTIALS,
            "Invalid Credentials",
            None,
        ),
        AccountError::Repo(RepoError::Duplicate { .. }) => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Email already registered",
            None,
        ),
        AccountError::Repo(repo) => repo_to_api(repo),
        AccountError::UnknownRole(_) | AccountError::Token(_) | AccountError::Hashing(_) => {
            ApiError::internal(err.to_string())
        }
        AccountError::Interrupted(err) => interrupted_to_api(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_rejects_non_positive_and_garbage() {
        assert_eq!(parse_id("12").expect("valid"), 12);
        for raw in ["0", "-3", "abc", "1.5", ""] {
            let err = parse_id(raw).expect_err("invalid");
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn duplicate_email_maps_to_conflict() {
        let err = account_to_api(AccountError::Repo(RepoError::Duplicate {
            constraint: "users_email_key".to_string(),
        }));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), codes::DUPLICATE);
    }

    #[test]
    fn store_timeout_maps_to_unavailable() {
        assert_eq!(
            repo_to_api(RepoError::Timeout).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
