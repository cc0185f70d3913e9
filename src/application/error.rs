use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::{config::LoadError, infra::error::InfraError};

/// Diagnostic chain attached to failing responses for the response logger.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Failures that abort process startup or the server loop.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;

    use super::*;

    #[test]
    fn attached_report_is_readable_from_extensions() {
        let mut response = StatusCode::BAD_GATEWAY.into_response();
        ErrorReport::from_message("test", StatusCode::BAD_GATEWAY, "connection reset")
            .attach(&mut response);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.messages, vec!["connection reset".to_string()]);
    }

    #[test]
    fn configuration_errors_name_the_key() {
        let err = AppError::from(LoadError::Invalid {
            key: "auth.jwt_secret",
            reason: "a signing secret is required".to_string(),
        });
        assert!(err.to_string().contains("auth.jwt_secret"));
    }
}
