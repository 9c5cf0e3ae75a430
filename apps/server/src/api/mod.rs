pub mod goals;
pub mod notifications;
pub mod profiles;

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::main_lib::AppState;

/// The `{success, message, data}` success envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: message.into(),
        data,
    })
}

async fn ping() -> Json<ApiResponse<()>> {
    ok("pong", ())
}

pub fn app_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(goals::router())
        .merge(notifications::router())
        .merge(profiles::router())
        .route("/ping", get(ping));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
