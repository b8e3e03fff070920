use crate::auth::authenticate;
use crate::error::ServerError;
use crate::state::ServerState;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request identifier, stored in request extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Shared-token authentication middleware
///
/// On success the caller's [`ClientIdentity`](crate::auth::ClientIdentity)
/// is available to handlers as a request extension.
pub async fn shared_token_auth(
    State(state): State<Arc<ServerState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let identity = match authenticate(request.headers(), state.credentials.as_ref()) {
        Ok(identity) => identity,
        Err(err) => {
            tracing::warn!(
                uri = %request.uri(),
                status = err.status_code().as_u16(),
                reason = %err,
                "auth_rejected"
            );
            return Err(err.into());
        }
    };

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Request ID injection middleware
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Logging middleware
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    let response = next.run(request).await;
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = status.as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        request_id = %request_id,
        "request_completed"
    );

    response
}
