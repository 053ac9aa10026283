use crate::models::AppState;
use axum::{routing::get, Router};

pub mod appointment_routes;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", appointment_routes::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}
