//! imgdepot Ingest Layer
//!
//! This is the gate every upload passes before anything touches the disk. We
//! take the untyped `images` field of a request body and check its shape,
//! its length and each element against an [`IngestPolicy`].
//!
//! ## What we do here
//!
//! - **Shape** - the field must exist and be an array.
//! - **Count** - no more than `max_images` elements.
//! - **Per item, in order** - each element is a string, its decoded-size
//!   estimate fits `max_size_bytes`, and if it is a full data URI its media
//!   type is on the allow-list.
//!
//! The first violation wins. Validation is pure: no I/O, no clocks in the
//! result, same input and policy give the same answer.
//!
//! ## Example
//!
//! ```
//! use ingest::{validate, IngestError, IngestPolicy};
//! use serde_json::json;
//!
//! let policy = IngestPolicy::default();
//! assert!(validate(Some(&json!(["iVBORw0KGgo"])), &policy).is_ok());
//! assert_eq!(validate(None, &policy), Err(IngestError::MissingImages));
//! assert_eq!(
//!     validate(Some(&json!("x")), &policy),
//!     Err(IngestError::InvalidImagesFormat)
//! );
//! ```
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

mod config;
mod error;

pub use crate::config::{
    ConfigError, IngestPolicy, DEFAULT_ALLOWED_TYPES, DEFAULT_MAX_IMAGES, DEFAULT_MAX_SIZE_BYTES,
};
pub use crate::error::IngestError;

/// Validate the `images` field of a request body.
pub fn validate(images: Option<&Value>, policy: &IngestPolicy) -> Result<(), IngestError> {
    let start = Instant::now();
    match validate_inner(images, policy) {
        Ok(count) => {
            debug!(
                count,
                elapsed_micros = start.elapsed().as_micros(),
                "images_validated"
            );
            Ok(())
        }
        Err(err) => {
            warn!(
                code = err.code(),
                index = ?err.index(),
                error = %err,
                elapsed_micros = start.elapsed().as_micros(),
                "images_rejected"
            );
            Err(err)
        }
    }
}

/// Validate a whole JSON body by looking up its `images` field.
///
/// A body that is not an object has no `images` field.
pub fn validate_body(body: &Value, policy: &IngestPolicy) -> Result<(), IngestError> {
    validate(body.get("images"), policy)
}

/// Decoded-size estimate for a base64 string of `encoded_len` characters.
pub fn estimated_decoded_size(encoded_len: usize) -> usize {
    encoded_len.saturating_mul(3).div_ceil(4)
}

fn validate_inner(images: Option<&Value>, policy: &IngestPolicy) -> Result<usize, IngestError> {
    let items = match images {
        None | Some(Value::Null) => return Err(IngestError::MissingImages),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(IngestError::InvalidImagesFormat),
    };

    if items.len() > policy.max_images {
        return Err(IngestError::TooManyImages {
            count: items.len(),
            max: policy.max_images,
        });
    }

    for (index, item) in items.iter().enumerate() {
        let Some(encoded) = item.as_str() else {
            return Err(IngestError::InvalidImageFormat { index });
        };

        // Measured in UTF-16 code units, as browser clients count string length.
        let estimated = estimated_decoded_size(encoded.encode_utf16().count());
        if estimated > policy.max_size_bytes {
            return Err(IngestError::FileTooLarge {
                index,
                estimated,
                max: policy.max_size_bytes,
            });
        }

        if let Some(uri) = codec::split_data_uri(encoded) {
            if !policy.allows_type(uri.mime) {
                return Err(IngestError::UnsupportedFileType {
                    index,
                    mime: uri.mime.to_string(),
                });
            }
        }
    }

    Ok(items.len())
}
