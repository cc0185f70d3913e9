mod error;
pub mod handlers;
mod middleware;
mod state;

pub use error::{ApiError, codes};
pub use middleware::RequestContext;
pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};

/// Full HTTP surface: public account routes plus the bearer-protected API.
pub fn build_router(state: ApiState) -> Router {
    let protected = Router::new()
        .route(
            "/api/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route(
            "/api/posts/{id}",
            get(handlers::get_post).delete(handlers::delete_post),
        )
        .route("/api/admin/users", get(handlers::list_users))
        .route("/api/admin/users/{id}/roles", post(handlers::assign_role))
        .route(
            "/api/admin/users/{id}/roles/{role}",
            delete(handlers::remove_role),
        )
        .route("/api/admin/roles", get(handlers::list_roles))
        .route(
            "/api/admin/roles/{id}/permissions",
            post(handlers::assign_permission),
        )
        .route(
            "/api/admin/roles/{id}/permissions/{permission}",
            delete(handlers::remove_permission),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_principal,
        ));

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/ping", get(handlers::ping))
        .route("/api/register", post(handlers::register))
        .route("/api/login", post(handlers::login))
        .merge(protected)
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
