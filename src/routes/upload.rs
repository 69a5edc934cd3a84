//! Attachment upload — multipart file in, stable retrievable URL out.
//!
//! The engine itself never reads attachments back; it only carries the
//! returned URL inside chat messages. Stored files are served statically
//! under `/uploads/` by the router.

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::info;

use crate::state::{AppState, now_ms};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("file upload failed")]
    MissingFile,
    #[error("multipart read failed: {0}")]
    Multipart(String),
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingFile | Self::Multipart(_) => StatusCode::BAD_REQUEST,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Store the `file` part of a multipart request under the upload directory
/// and return its public path.
///
/// # Errors
///
/// Returns `MissingFile` when no `file` part is present, or an IO error when
/// the write fails.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, UploadError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original = field
            .file_name()
            .map(sanitize_filename)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("file-{:08x}", rand::random::<u32>()));
        let filename = format!("{}-{original}", now_ms());

        let bytes = field
            .bytes()
            .await
            .map_err(|e| UploadError::Multipart(e.to_string()))?;
        tokio::fs::write(state.upload_dir.join(&filename), &bytes).await?;
        info!(%filename, size = bytes.len(), "attachment stored");

        let path = format!("/uploads/{filename}");
        return Ok(Json(UploadResponse { filename, path }));
    }

    Err(UploadError::MissingFile)
}

/// Keep filenames shell- and URL-safe; everything else becomes '_'.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "upload_test.rs"]
mod tests;
