//! Validation policy for incoming image batches.
//!
//! [`IngestPolicy`] is built once at start-up and shared by reference with
//! every request. It is cheap to clone and deserializes from JSON, TOML or
//! environment-derived settings.
//!
//! ```rust
//! use ingest::IngestPolicy;
//!
//! let policy = IngestPolicy::default();
//! assert_eq!(policy.max_images, 10);
//! assert!(policy.allows_type("image/PNG"));
//! policy.validate().expect("default policy is valid");
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default cap on the number of images per request.
pub const DEFAULT_MAX_IMAGES: usize = 10;

/// Default cap on the estimated decoded size of a single image (5 MiB).
pub const DEFAULT_MAX_SIZE_BYTES: usize = 5 * 1024 * 1024;

/// Media types accepted when an item carries a `data:` prefix.
pub const DEFAULT_ALLOWED_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/gif",
    "image/webp",
];

/// Limits applied by [`validate`](crate::validate).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestPolicy {
    /// Maximum length of the `images` array.
    #[serde(default = "default_max_images")]
    pub max_images: usize,

    /// Maximum estimated decoded size, in bytes, of any one item.
    ///
    /// The estimate is `ceil(len * 3 / 4)` of the encoded string.
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: usize,

    /// MIME allow-list. Compact tokens carry no type and are not checked.
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for IngestPolicy {
    fn default() -> Self {
        Self {
            max_images: default_max_images(),
            max_size_bytes: default_max_size_bytes(),
            allowed_types: default_allowed_types(),
        }
    }
}

impl IngestPolicy {
    /// Reject policies that would refuse every request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_images == 0 {
            return Err(ConfigError::ZeroMaxImages);
        }
        if self.max_size_bytes == 0 {
            return Err(ConfigError::ZeroMaxSize);
        }
        if self.allowed_types.is_empty() {
            return Err(ConfigError::EmptyAllowedTypes);
        }
        Ok(())
    }

    /// Case-insensitive membership test against `allowed_types`.
    pub fn allows_type(&self, mime: &str) -> bool {
        self.allowed_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(mime))
    }
}

/// Start-up errors for an [`IngestPolicy`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("max_images must be at least 1")]
    ZeroMaxImages,

    #[error("max_size_bytes must be at least 1")]
    ZeroMaxSize,

    #[error("allowed_types must list at least one media type")]
    EmptyAllowedTypes,
}

fn default_max_images() -> usize {
    DEFAULT_MAX_IMAGES
}

fn default_max_size_bytes() -> usize {
    DEFAULT_MAX_SIZE_BYTES
}

fn default_allowed_types() -> Vec<String> {
    DEFAULT_ALLOWED_TYPES.iter().map(|t| t.to_string()).collect()
}
