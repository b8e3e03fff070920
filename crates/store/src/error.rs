//! Error types produced by the store crate.
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Filesystem failures while materializing a batch.
///
/// Every variant is fatal for the batch it occurred in. Items that merely do
/// not look like images are skipped and never surface as errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The destination directory was not present right after creating it.
    #[error("directory {} could not be created", .0.display())]
    DirectoryCreation(PathBuf),

    /// An I/O call failed.
    #[error("{op} failed for {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| StoreError::Io { op, path, source }
    }
}
