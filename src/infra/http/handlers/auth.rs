//! Registration and login handlers

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use postcache_api_types::{LoginRequest, RegisterRequest};

use crate::application::auth::{LoginCommand, RegisterCommand};

use super::{account_to_api, json_body};
use crate::infra::http::error::ApiError;
use crate::infra::http::state::ApiState;

pub async fn register(
    State(state): State<ApiState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    let user = state
        .auth
        .register(RegisterCommand {
            name: payload.name,
            email: payload.email,
            password: payload.password,
        })
        .await
        .map_err(account_to_api)?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<ApiState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    let outcome = state
        .auth
        .login(LoginCommand {
            email: payload.email,
            password: payload.password,
        })
        .await
        .map_err(account_to_api)?;

    Ok(Json(outcome))
}
