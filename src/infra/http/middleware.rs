use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, StatusCode, header::AUTHORIZATION};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::auth::{AuthError, Principal};
use crate::application::error::ErrorReport;

use super::error::{ApiError, codes};
use super::state::ApiState;

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Caller identity copied onto the response for the response logger.
#[derive(Clone, Copy)]
struct CallerContext {
    user_id: i64,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response.extensions_mut().insert(ctx);
    response
}

/// Authenticate the bearer credential and expose the principal to handlers.
pub async fn require_principal(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_token(request.headers().get(AUTHORIZATION)) else {
        return ApiError::unauthorized().into_response();
    };

    let principal: Principal = match state.auth.authenticate(&token).await {
        Ok(principal) => principal,
        Err(AuthError::Expired) => {
            return ApiError::new(
                StatusCode::UNAUTHORIZED,
                codes::TOKEN_EXPIRED,
                "Bearer token expired",
                None,
            )
            .into_response();
        }
        Err(AuthError::MissingCredential) | Err(AuthError::InvalidCredential) => {
            return ApiError::new(
                StatusCode::UNAUTHORIZED,
                codes::UNAUTHORIZED,
                "Bearer token invalid",
                None,
            )
            .into_response();
        }
        Err(err @ AuthError::Forbidden { .. }) => {
            return ApiError::forbidden(err.to_string()).into_response();
        }
        Err(AuthError::Repo(err)) => {
            return super::handlers::repo_to_api(err).into_response();
        }
    };

    let caller = CallerContext {
        user_id: principal.user_id,
    };
    request.extensions_mut().insert(principal);

    let mut response = next.run(request).await;
    response.extensions_mut().insert(caller);
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let user_id = response
            .extensions()
            .get::<CallerContext>()
            .map(|caller| caller.user_id.to_string())
            .unwrap_or_default();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "postcache::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                user_id = user_id,
                "request failed",
            );
        } else {
            warn!(
                target = "postcache::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                user_id = user_id,
                "client request error",
            );
        }
    }

    response
}

fn extract_token(header: Option<&HeaderValue>) -> Option<String> {
    let raw = header?.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?.trim();
    if bearer.is_empty() {
        return None;
    }
    Some(bearer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_token_requires_bearer_scheme() {
        let header = HeaderValue::from_static("Bearer abc.def.ghi");
        assert_eq!(extract_token(Some(&header)).as_deref(), Some("abc.def.ghi"));

        let basic = HeaderValue::from_static("Basic dXNlcjpwYXNz");
        assert!(extract_token(Some(&basic)).is_none());

        let empty = HeaderValue::from_static("Bearer ");
        assert!(extract_token(Some(&empty)).is_none());
        assert!(extract_token(None).is_none());
    }
}
