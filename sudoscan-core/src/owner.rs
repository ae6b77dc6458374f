//! Split matched paths by who owns them.

use std::fs::{self, Metadata};
use std::io;
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use tracing::debug;

/// The superuser's uid
pub const ROOT_UID: u32 = 0;

/// Matched paths split by owner. The two lists never share a path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipPartition {
    /// Files owned by uid 0
    pub privileged: Vec<PathBuf>,
    /// Files owned by anyone else
    pub other: Vec<PathBuf>,
}

impl OwnershipPartition {
    pub fn len(&self) -> usize {
        self.privileged.len() + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.privileged.is_empty() && self.other.is_empty()
    }
}

/// Classify each path by its owner, keeping input order within each list.
///
/// Files can disappear or lose permissions between the walk and this call;
/// such paths are left out of both lists rather than reported.
pub fn classify_by_owner(paths: &[PathBuf]) -> OwnershipPartition {
    let mut partition = OwnershipPartition::default();

    for path in paths {
        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(err) => {
                if !matches!(
                    err.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
                ) {
                    debug!(path = %path.display(), error = %err, "dropping unreadable match");
                }
                continue;
            }
        };

        if get_owner_uid(&metadata) == Some(ROOT_UID) {
            partition.privileged.push(path.clone());
        } else {
            partition.other.push(path.clone());
        }
    }

    partition
}

#[cfg(unix)]
fn get_owner_uid(metadata: &Metadata) -> Option<u32> {
    Some(metadata.uid())
}

/// No owning uid outside unix
#[cfg(not(unix))]
fn get_owner_uid(_metadata: &Metadata) -> Option<u32> {
    None
}
