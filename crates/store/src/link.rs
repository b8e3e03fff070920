//! Public link to the private storage root.
//!
//! The static routes serve `<public>/storage`, which must point at the
//! storage root the materializer writes into. Startup calls
//! [`ensure_public_link`] once; failures are logged and startup continues.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{error, info, warn};

/// What [`ensure_public_link`] found or did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// The symlink was created.
    Created,
    /// A symlink was already present.
    AlreadyLinked,
    /// Something other than a symlink occupies the link path.
    NotASymlink,
    /// An I/O error prevented setup.
    Failed,
}

/// Make sure `storage_root` exists and `public_link` is a symlink to it.
pub fn ensure_public_link(storage_root: &Path, public_link: &Path) -> LinkStatus {
    match try_ensure_public_link(storage_root, public_link) {
        Ok(status) => status,
        Err(err) => {
            error!(
                storage_root = %storage_root.display(),
                public_link = %public_link.display(),
                error = %err,
                "storage_link_failed"
            );
            LinkStatus::Failed
        }
    }
}

fn try_ensure_public_link(storage_root: &Path, public_link: &Path) -> io::Result<LinkStatus> {
    if !storage_root.exists() {
        fs::create_dir_all(storage_root)?;
        info!(storage_root = %storage_root.display(), "storage_root_created");
    }

    match fs::symlink_metadata(public_link) {
        Ok(meta) if meta.file_type().is_symlink() => Ok(LinkStatus::AlreadyLinked),
        Ok(_) => {
            warn!(
                public_link = %public_link.display(),
                "public storage path exists but is not a symlink"
            );
            Ok(LinkStatus::NotASymlink)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            if let Some(parent) = public_link.parent() {
                fs::create_dir_all(parent)?;
            }
            // A relative target would resolve against the link's own directory.
            let target = fs::canonicalize(storage_root)?;
            symlink_dir(&target, public_link)?;
            info!(
                target = %target.display(),
                public_link = %public_link.display(),
                "storage_link_created"
            );
            Ok(LinkStatus::Created)
        }
        Err(err) => Err(err),
    }
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}
