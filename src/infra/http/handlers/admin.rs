//! Role and permission management handlers

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, State};
use axum::response::IntoResponse;
use postcache_api_types::{MessageResponse, PermissionAssignmentRequest, RoleAssignmentRequest};

use crate::application::auth::Principal;
use crate::domain::permissions::MANAGE_ROLES;

use super::{admin_to_api, auth_to_api, json_body, parse_id};
use crate::infra::http::error::ApiError;
use crate::infra::http::state::ApiState;

pub async fn list_users(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state
        .admin
        .list_users(&principal)
        .await
        .map_err(admin_to_api)?;
    Ok(Json(users))
}

pub async fn assign_role(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<String>,
    payload: Result<Json<RoleAssignmentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    principal.require(MANAGE_ROLES).map_err(auth_to_api)?;
    let user_id = parse_id(&user_id)?;
    let payload = json_body(payload)?;
    let message = state
        .admin
        .assign_role(&principal, user_id, payload.role)
        .await
        .map_err(admin_to_api)?;
    Ok(Json(MessageResponse::new(message)))
}

pub async fn remove_role(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path((user_id, role)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    principal.require(MANAGE_ROLES).map_err(auth_to_api)?;
    let user_id = parse_id(&user_id)?;
    let message = state
        .admin
        .remove_role(&principal, user_id, role)
        .await
        .map_err(admin_to_api)?;
    Ok(Json(MessageResponse::new(message)))
}

pub async fn list_roles(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    let roles = state
        .admin
        .list_roles(&principal)
        .await
        .map_err(admin_to_api)?;
    Ok(Json(roles))
}

pub async fn assign_permission(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(role_id): Path<String>,
    payload: Result<Json<PermissionAssignmentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    principal.require(MANAGE_ROLES).map_err(auth_to_api)?;
    let role_id = parse_id(&role_id)?;
    let payload = json_body(payload)?;
    let message = state
        .admin
        .assign_permission(&principal, role_id, payload.permission)
        .await
        .map_err(admin_to_api)?;
    Ok(Json(MessageResponse::new(message)))
}

pub async fn remove_permission(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path((role_id, permission)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    principal.require(MANAGE_ROLES).map_err(auth_to_api)?;
    let role_id = parse_id(&role_id)?;
    let message = state
        .admin
        .remove_permission(&principal, role_id, permission)
        .await
        .map_err(admin_to_api)?;
    Ok(Json(MessageResponse::new(message)))
}
