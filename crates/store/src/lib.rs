//! imgdepot Store Layer
//!
//! Writes decoded images to disk. The unit of work is an *article*: one
//! directory that is wiped and refilled on every batch, so re-processing an
//! article id always starts from an empty directory.
//!
//! - [`reset_directory`] removes and recreates a directory with open
//!   permissions, failing with [`StoreError::DirectoryCreation`] if it is not
//!   there afterwards.
//! - [`write_image`] decodes a `data:image/<ext>;base64,<payload>` URI into
//!   `<uuid>.<ext>`. Anything that does not look like that is skipped.
//! - [`materialize_article`] does both for a whole batch, in input order.
//! - [`ensure_public_link`] sets up the symlink the static routes serve from.
//!
//! There is no locking here. Two concurrent batches for the same directory
//! race on delete/create/write; callers that can receive such requests must
//! serialize them.
//!
//! ```no_run
//! use std::path::Path;
//!
//! let uri = "data:image/gif;base64,R0lGODlhAQABAIAAAP///wAAACH5BAEAAAAALAAAAAABAAEAAAICRAEAOw==";
//! let stored = store::materialize_article(&[uri], Path::new("storage/images/articles/1"))?;
//! println!("wrote {}", stored[0].filename);
//! # Ok::<(), store::StoreError>(())
//! ```

mod error;
mod link;
mod materialize;

pub use crate::error::StoreError;
pub use crate::link::{ensure_public_link, LinkStatus};
pub use crate::materialize::{
    materialize_article, reset_directory, write_all, write_image, StoredImage,
};
