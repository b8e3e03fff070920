//! Public file access.

use crate::error::{ServerError, ServerResult};
use crate::routes::is_safe_segment;
use crate::state::ServerState;
use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use codec::content_type_for_path;
use std::io::ErrorKind;
use std::sync::Arc;

const FILE_CACHE_CONTROL: &str = "public, max-age=86400";
const IMAGE_MISSING: &str = "Sorry, the image you are looking for does not exist.";
const STORAGE_MISSING: &str = "Sorry, the requested file in storage does not exist.";

fn file_not_found() -> Response {
    (StatusCode::NOT_FOUND, "File not found").into_response()
}

/// Read one stored file (GET /api/public-file/{article_id}/{filename})
pub async fn public_file(
    State(state): State<Arc<ServerState>>,
    Path((article_id, filename)): Path<(String, String)>,
) -> ServerResult<Response> {
    if !is_safe_segment(&article_id) || !is_safe_segment(&filename) {
        return Ok(file_not_found());
    }

    let path = state.config.article_dir(&article_id).join(&filename);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Ok(file_not_found()),
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(file_not_found()),
        Err(err) => return Err(err.into()),
    }

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(file_not_found()),
        Err(err) => {
            return Err(ServerError::Internal(format!(
                "reading {}: {err}",
                path.display()
            )))
        }
    };

    Ok((
        [
            (CONTENT_TYPE, content_type_for_path(&filename)),
            (CACHE_CONTROL, FILE_CACHE_CONTROL),
        ],
        bytes,
    )
        .into_response())
}

/// Miss handler for `/images`.
pub async fn image_missing() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, IMAGE_MISSING)
}

/// Miss handler for `/storage`.
pub async fn storage_missing() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, STORAGE_MISSING)
}
