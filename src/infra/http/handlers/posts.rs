//! Posts handlers

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use postcache_api_types::{CreatePostRequest, MessageResponse};

use crate::application::auth::Principal;
use crate::application::posts::CreatePostCommand;
use crate::domain::permissions::{CREATE_POST, DELETE_POST};

use super::{auth_to_api, json_body, parse_id, post_to_api};
use crate::infra::http::error::ApiError;
use crate::infra::http::state::ApiState;

pub async fn list_posts(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = state.posts.list(&principal).await.map_err(post_to_api)?;
    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let post = state
        .posts
        .get(&principal, id)
        .await
        .map_err(post_to_api)?;
    Ok(Json(post))
}

pub async fn create_post(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    principal.require(CREATE_POST).map_err(auth_to_api)?;
    let payload = json_body(payload)?;
    let post = state
        .posts
        .create(
            &principal,
            CreatePostCommand {
                title: payload.title,
                content: payload.content,
            },
        )
        .await
        .map_err(post_to_api)?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn delete_post(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    principal.require(DELETE_POST).map_err(auth_to_api)?;
    let id = parse_id(&id)?;
    state
        .posts
        .delete(&principal, id)
        .await
        .map_err(post_to_api)?;

    Ok(Json(MessageResponse::new("Post deleted successfully")))
}
