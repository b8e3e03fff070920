//! Turning rebuilt data URIs into files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::StoreError;

/// `data:image/<ext>;base64,<payload>` with a non-empty payload.
static IMAGE_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^data:image/([A-Za-z0-9_]+);base64,(.+)$")
        .expect("image data URI pattern is a valid regex")
});

/// Standard alphabet, tolerant of missing padding and non-zero trailing bits.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// One file written by [`write_image`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Generated `<uuid>.<ext>` name.
    pub filename: String,
    /// Directory the file was written into.
    pub directory: PathBuf,
}

impl StoredImage {
    /// Full path of the written file.
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

/// Empty `dir`, creating it if needed.
///
/// An existing directory has its permissions opened up and is removed with
/// everything in it; the directory is then recreated with `0o777`.
pub fn reset_directory(dir: &Path) -> Result<(), StoreError> {
    if dir.exists() {
        if let Err(err) = open_permissions(dir) {
            warn!(dir = %dir.display(), error = %err, "permission_reset_failed");
        }
        fs::remove_dir_all(dir).map_err(StoreError::io("remove_dir_all", dir))?;
    }

    fs::create_dir_all(dir).map_err(StoreError::io("create_dir_all", dir))?;
    if let Err(err) = open_permissions(dir) {
        warn!(dir = %dir.display(), error = %err, "permission_reset_failed");
    }

    if !dir.is_dir() {
        return Err(StoreError::DirectoryCreation(dir.to_path_buf()));
    }
    Ok(())
}

/// Decode one data URI into `dir` under a fresh random name.
///
/// Returns `Ok(None)` when the input is not an image data URI or its payload
/// is not base64; those items are dropped without failing the batch.
pub fn write_image(data_uri: &str, dir: &Path) -> Result<Option<StoredImage>, StoreError> {
    let Some(caps) = IMAGE_URI.captures(data_uri) else {
        debug!(reason = "pattern_mismatch", "image_skipped");
        return Ok(None);
    };
    let ext = &caps[1];

    let bytes = match PAYLOAD_ENGINE.decode(&caps[2]) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(reason = "invalid_base64", error = %err, "image_skipped");
            return Ok(None);
        }
    };

    let filename = format!("{}.{ext}", Uuid::new_v4());
    let path = dir.join(&filename);
    fs::write(&path, &bytes).map_err(StoreError::io("write", &path))?;
    debug!(file = %filename, bytes = bytes.len(), "image_written");

    Ok(Some(StoredImage {
        filename,
        directory: dir.to_path_buf(),
    }))
}

/// Write every item in order, dropping skipped ones in place.
pub fn write_all<S: AsRef<str>>(items: &[S], dir: &Path) -> Result<Vec<StoredImage>, StoreError> {
    let mut stored = Vec::with_capacity(items.len());
    for item in items {
        if let Some(image) = write_image(item.as_ref(), dir)? {
            stored.push(image);
        }
    }
    Ok(stored)
}

/// Replace the contents of an article directory with `items`.
///
/// Re-running this for the same directory never merges with earlier output.
pub fn materialize_article<S: AsRef<str>>(
    items: &[S],
    dir: &Path,
) -> Result<Vec<StoredImage>, StoreError> {
    let start = Instant::now();
    reset_directory(dir)?;
    let stored = write_all(items, dir)?;
    info!(
        dir = %dir.display(),
        received = items.len(),
        written = stored.len(),
        skipped = items.len() - stored.len(),
        elapsed_micros = start.elapsed().as_micros(),
        "article_images_written"
    );
    Ok(stored)
}

#[cfg(unix)]
fn open_permissions(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(dir, fs::Permissions::from_mode(0o777))
}

#[cfg(not(unix))]
fn open_permissions(dir: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(dir)?.permissions();
    perms.set_readonly(false);
    fs::set_permissions(dir, perms)
}
