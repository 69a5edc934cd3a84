mod event;
mod llm;
mod registry;
mod routes;
mod services;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use crate::llm::{GeminiClient, LlmComplete};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3001".into())
        .parse()
        .expect("invalid PORT");
    let upload_dir = std::env::var("UPLOAD_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("uploads"));
    std::fs::create_dir_all(&upload_dir).expect("upload dir init failed");

    // Initialize the analysis model (non-fatal: analysis disabled if config missing).
    let llm: Option<Arc<dyn LlmComplete>> = match GeminiClient::from_env() {
        Ok(client) => {
            tracing::info!(model = client.model(), "analysis model initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "analysis model not configured, code analysis disabled");
            None
        }
    };

    let state = state::AppState::new(llm, upload_dir);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "codeboard listening");
    axum::serve(listener, app).await.expect("server failed");
}
