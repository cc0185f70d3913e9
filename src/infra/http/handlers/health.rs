use axum::Json;
use postcache_api_types::{HealthResponse, MessageResponse};

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn ping() -> Json<MessageResponse> {
    Json(MessageResponse::new("pong"))
}
