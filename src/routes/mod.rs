//! Router assembly.
//!
//! Binds the websocket endpoint, the attachment upload endpoint, and static
//! delivery of stored uploads under a single Axum router with permissive
//! CORS (clients are served from arbitrary origins).

pub mod upload;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws::handle_ws))
        .route("/upload", post(upload::upload))
        .nest_service("/uploads", ServeDir::new(&state.upload_dir))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
