use crate::auth::ClientIdentity;
use crate::error::{ServerError, ServerResult};
use crate::routes::is_safe_segment;
use crate::state::ServerState;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Response from processing an article's images
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessImagesResponse {
    /// Generated filenames, in request order, skipped items omitted
    pub image_names: Vec<String>,
}

/// Replace an article's images (POST /api/articles/{article_id}/process-images)
///
/// Body: `{ "images": [ <data URI or compact token>, ... ] }`. The article
/// directory is emptied first, so the response lists every file it now holds.
pub async fn process_images(
    State(state): State<Arc<ServerState>>,
    Path(article_id): Path<String>,
    Extension(client): Extension<ClientIdentity>,
    body: Result<Bytes, BytesRejection>,
) -> ServerResult<Json<ProcessImagesResponse>> {
    let start = Instant::now();

    if !is_safe_segment(&article_id) {
        return Err(ServerError::bad_request(
            "Invalid article id",
            "Use letters, digits, '-', '_' or '.'",
        ));
    }

    let body = match body {
        Ok(body) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(ServerError::PayloadTooLarge(state.config.max_body_size_mb));
        }
        Err(rejection) => {
            return Err(ServerError::bad_request(
                "Invalid request body",
                rejection.body_text(),
            ));
        }
    };

    let body: Value = serde_json::from_slice(&body)?;
    ingest::validate_body(&body, &state.config.ingest)?;
    let images: Vec<String> = body["images"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let received = images.len();
    let dir = state.config.article_dir(&article_id);

    // A timed-out request still finishes its batch; the article stays locked until it does.
    let image_names = state
        .article_locks
        .run_exclusive(&article_id, move || {
            imgdepot::process_article_images(images.as_slice(), &dir)
        })
        .await??;

    tracing::info!(
        article_id = %article_id,
        client = %client.name,
        received,
        stored = image_names.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "article_images_processed"
    );

    Ok(Json(ProcessImagesResponse { image_names }))
}
