//! Workspace umbrella crate for imgdepot.
//!
//! This crate stitches the codec and the store together so callers can turn a
//! batch of client-supplied image strings into files with one call. Validation
//! lives in [`ingest`] and is expected to run first; the pipeline itself never
//! rejects an item, it only skips what cannot be stored.

pub use codec::{
    compress, content_type_for_path, rebuild, rebuild_default, rebuild_value, sniff_image_mime,
    split_data_uri, DataUri, DEFAULT_MIME,
};
pub use ingest::{
    estimated_decoded_size, validate, validate_body, IngestError, IngestPolicy,
};
pub use store::{
    ensure_public_link, materialize_article, reset_directory, write_all, write_image, LinkStatus,
    StoreError, StoredImage,
};

use std::path::Path;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while writing an article's images.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

/// Normalise one client item to a full data URI.
///
/// - A well-formed data URI goes through the compact form and comes back with
///   the same type and payload. Without extra parameters that is byte-for-byte.
/// - A `data:` string that does not parse becomes an empty default URI, which
///   the store skips.
/// - Anything else is a compact token. Its media type is read from the
///   decoded signature, defaulting to [`DEFAULT_MIME`].
pub fn prepare_item(item: &str) -> String {
    if let Some(uri) = split_data_uri(item) {
        return rebuild(&compress(item), uri.mime);
    }
    if item.starts_with("data:") {
        return rebuild_default("");
    }
    let mime = sniff_image_mime(item).unwrap_or(DEFAULT_MIME);
    rebuild(item, mime)
}

/// Replace the contents of `dir` with the images in `items`.
///
/// Returns the generated filenames in input order. Items that are not
/// storable images are dropped from the result.
pub fn process_article_images<S: AsRef<str>>(
    items: &[S],
    dir: &Path,
) -> Result<Vec<String>, PipelineError> {
    let start = Instant::now();
    let prepared: Vec<String> = items
        .iter()
        .map(|item| prepare_item(item.as_ref()))
        .collect();
    debug!(count = prepared.len(), "items_prepared");

    let stored = materialize_article(&prepared, dir)?;
    let names: Vec<String> = stored.into_iter().map(|image| image.filename).collect();

    info!(
        dir = %dir.display(),
        stored = names.len(),
        elapsed_micros = start.elapsed().as_micros(),
        "article_processed"
    );
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIF_URI: &str =
        "data:image/gif;base64,R0lGODlhAQABAIAAAP///wAAACH5BAEAAAAALAAAAAABAAEAAAICRAEAOw==";

    #[test]
    fn test_prepare_keeps_well_formed_uri() {
        assert_eq!(prepare_item(GIF_URI), GIF_URI);
    }

    #[test]
    fn test_prepare_compact_token_sniffs_type() {
        let token = compress(GIF_URI);
        assert_eq!(prepare_item(&token), GIF_URI);
    }

    #[test]
    fn test_prepare_unknown_signature_defaults_to_jpeg() {
        let prepared = prepare_item("AAAA");
        assert_eq!(prepared, "data:image/jpeg;base64,AAAA");
    }

    #[test]
    fn test_prepare_malformed_data_uri() {
        assert_eq!(prepare_item("data:image/png;base64"), "data:image/jpeg;base64,");
        assert_eq!(prepare_item("data:;base64,xyz"), "data:image/jpeg;base64,");
    }
}
