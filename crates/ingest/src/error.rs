//! Error types produced by the ingest crate.
//!
//! Every variant maps to one client-facing rejection. Callers at the HTTP
//! boundary use [`IngestError::code`], [`IngestError::message`] and
//! [`IngestError::details`] to build a `400 {error, details}` body:
//!
//! | Variant | Code | Message |
//! |---------|------|---------|
//! | [`MissingImages`](IngestError::MissingImages) | `MISSING_IMAGES_ARRAY` | Images array is required |
//! | [`InvalidImagesFormat`](IngestError::InvalidImagesFormat) | `INVALID_IMAGES_FORMAT` | Images must be an array |
//! | [`TooManyImages`](IngestError::TooManyImages) | `TOO_MANY_IMAGES` | Too many images |
//! | [`InvalidImageFormat`](IngestError::InvalidImageFormat) | `INVALID_IMAGE_FORMAT` | Invalid image format |
//! | [`FileTooLarge`](IngestError::FileTooLarge) | `FILE_TOO_LARGE` | File too large |
//! | [`UnsupportedFileType`](IngestError::UnsupportedFileType) | `INVALID_FILE_TYPE` | Unsupported file type |
//!
//! ```rust
//! use ingest::IngestError;
//!
//! let err = IngestError::TooManyImages { count: 11, max: 10 };
//! assert_eq!(err.code(), "TOO_MANY_IMAGES");
//! assert_eq!(err.details().as_deref(), Some("Maximum 10 images allowed"));
//! ```
use thiserror::Error;

/// Rejections raised by [`validate`](crate::validate).
///
/// The enum is `#[non_exhaustive]`; match with a catch-all arm.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    /// The `images` field is absent or `null`.
    #[error("images array is required")]
    MissingImages,

    /// The `images` field is present but is not an array.
    #[error("images must be an array")]
    InvalidImagesFormat,

    /// The array is longer than the policy allows.
    #[error("too many images: {count} exceeds maximum of {max}")]
    TooManyImages { count: usize, max: usize },

    /// An element of the array is not a string.
    #[error("image at index {index} must be a string")]
    InvalidImageFormat { index: usize },

    /// The decoded-size estimate of an element exceeds the policy limit.
    #[error("image at index {index} is too large: estimated {estimated} bytes exceeds {max}")]
    FileTooLarge {
        index: usize,
        estimated: usize,
        max: usize,
    },

    /// A data URI element declares a media type outside the allow-list.
    #[error("image at index {index} has unsupported type {mime}")]
    UnsupportedFileType { index: usize, mime: String },
}

impl IngestError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::MissingImages => "MISSING_IMAGES_ARRAY",
            IngestError::InvalidImagesFormat => "INVALID_IMAGES_FORMAT",
            IngestError::TooManyImages { .. } => "TOO_MANY_IMAGES",
            IngestError::InvalidImageFormat { .. } => "INVALID_IMAGE_FORMAT",
            IngestError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            IngestError::UnsupportedFileType { .. } => "INVALID_FILE_TYPE",
        }
    }

    /// Short client-facing message.
    pub fn message(&self) -> &'static str {
        match self {
            IngestError::MissingImages => "Images array is required",
            IngestError::InvalidImagesFormat => "Images must be an array",
            IngestError::TooManyImages { .. } => "Too many images",
            IngestError::InvalidImageFormat { .. } => "Invalid image format",
            IngestError::FileTooLarge { .. } => "File too large",
            IngestError::UnsupportedFileType { .. } => "Unsupported file type",
        }
    }

    /// Optional elaboration, including the offending index where there is one.
    pub fn details(&self) -> Option<String> {
        match self {
            IngestError::MissingImages | IngestError::InvalidImagesFormat => None,
            IngestError::TooManyImages { max, .. } => Some(format!("Maximum {max} images allowed")),
            IngestError::InvalidImageFormat { index } => {
                Some(format!("Image at index {index} must be a string"))
            }
            IngestError::FileTooLarge { index, max, .. } => Some(format!(
                "Image at index {index} exceeds the maximum size of {max} bytes"
            )),
            IngestError::UnsupportedFileType { mime, .. } => {
                Some(format!("Unsupported type: {mime}"))
            }
        }
    }

    /// Index of the offending element, for per-item errors.
    pub fn index(&self) -> Option<usize> {
        match self {
            IngestError::InvalidImageFormat { index }
            | IngestError::FileTooLarge { index, .. }
            | IngestError::UnsupportedFileType { index, .. } => Some(*index),
            _ => None,
        }
    }
}
