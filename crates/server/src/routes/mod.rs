//! API route handlers
//!
//! - `health`: liveness with storage status
//! - `articles`: authenticated image upload per article
//! - `files`: public file reads and the static directory services

pub mod articles;
pub mod files;
pub mod health;

use crate::error::ServerError;
use axum::response::Html;

const BANNER: &str = r#"<!DOCTYPE html>
<html>
  <head><title>imgdepot</title></head>
  <body>
    <h1>Static server with Rust and axum</h1>
    <p>Browse <a href="/images">/images</a> or <a href="/storage">/storage</a>.</p>
  </body>
</html>
"#;

/// Landing page (GET /)
pub async fn banner() -> Html<&'static str> {
    Html(BANNER)
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}

/// True when `segment` can be joined onto a directory without leaving it.
pub(crate) fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment.len() <= 255
        && segment != "."
        && segment != ".."
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_segments() {
        for ok in ["42", "article-1", "a_b", "3f2a.png", "..png"] {
            assert!(is_safe_segment(ok), "{ok}");
        }
        for bad in ["", ".", "..", "../etc", "a/b", "a\\b", "a b", "ñ", "a\0b"] {
            assert!(!is_safe_segment(bad), "{bad:?}");
        }
    }
}
