use std::ffi::OsStr;
use std::fs::{self, DirEntry};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// A directory waiting to be listed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirTask {
    pub path: PathBuf,
}

impl DirTask {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Entries collected from one directory listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Regular files whose name contains the pattern
    pub matched_files: Vec<PathBuf>,
    /// Real directories (never symlinks) to scan next
    pub subdirectories: Vec<PathBuf>,
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.matched_files.is_empty() && self.subdirectories.is_empty()
    }
}

/// Outcome of listing a single directory.
///
/// Permission and link-depth failures are expected on real systems and are
/// tolerated as their own variants. Anything else ends up in `Failed` and is
/// reported by the walker for that directory only.
#[derive(Debug)]
pub enum DirScan {
    Listed(ScanResult),
    AccessDenied,
    ExcessiveLinkDepth,
    Failed(io::Error),
}

impl DirScan {
    fn from_io_error(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::PermissionDenied {
            DirScan::AccessDenied
        } else if is_link_depth_error(&err) {
            DirScan::ExcessiveLinkDepth
        } else {
            DirScan::Failed(err)
        }
    }

    /// True for the outcomes that are skipped without a report
    pub fn is_tolerated(&self) -> bool {
        matches!(self, DirScan::AccessDenied | DirScan::ExcessiveLinkDepth)
    }

    /// Listing contents, empty for every non-`Listed` outcome
    pub fn into_result(self) -> ScanResult {
        match self {
            DirScan::Listed(result) => result,
            _ => ScanResult::default(),
        }
    }
}

/// List the immediate entries of `path`, collecting regular files whose name
/// contains `pattern` and every real subdirectory.
///
/// Symbolic links are never followed: a link to a file or a directory is
/// skipped, as are devices, sockets and fifos.
pub fn scan_dir(path: &Path, pattern: &str) -> DirScan {
    scan_dir_with(path, pattern, |_| true)
}

/// Same as [`scan_dir`], but only keeps subdirectories accepted by `descend`.
pub(crate) fn scan_dir_with<F>(path: &Path, pattern: &str, descend: F) -> DirScan
where
    F: Fn(&DirEntry) -> bool,
{
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) => return DirScan::from_io_error(err),
    };

    let mut result = ScanResult::default();

    for entry in entries {
        // A listing that breaks halfway is treated like one that never opened
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => return DirScan::from_io_error(err),
        };

        // DirEntry::file_type does not traverse symlinks
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                debug!(path = %entry.path().display(), error = %err, "skipping entry of unknown type");
                continue;
            }
        };

        if file_type.is_file() {
            if name_matches(&entry.file_name(), pattern) {
                result.matched_files.push(entry.path());
            }
        } else if file_type.is_dir() && descend(&entry) {
            result.subdirectories.push(entry.path());
        }
    }

    DirScan::Listed(result)
}

fn name_matches(name: &OsStr, pattern: &str) -> bool {
    match name.to_str() {
        Some(name) => name.contains(pattern),
        None => name.to_string_lossy().contains(pattern),
    }
}

#[cfg(unix)]
fn is_link_depth_error(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::ELOOP)
}

#[cfg(not(unix))]
fn is_link_depth_error(_err: &io::Error) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sorted(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
        paths.sort();
        paths
    }

    #[test]
    fn test_scan_empty_dir() {
        let temp = TempDir::new().unwrap();
        let result = scan_dir(temp.path(), "sudo").into_result();
        assert!(result.is_empty());
    }

    #[test]
    fn test_scan_classifies_entries() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("sudoers"), "").unwrap();
        fs::write(root.join("visudo.8"), "").unwrap();
        fs::write(root.join("passwd"), "").unwrap();
        fs::create_dir(root.join("sudoers.d")).unwrap();
        fs::create_dir(root.join("bin")).unwrap();

        let result = match scan_dir(root, "sudo") {
            DirScan::Listed(result) => result,
            other => panic!("unexpected outcome: {other:?}"),
        };

        assert_eq!(
            sorted(result.matched_files),
            vec![root.join("sudoers"), root.join("visudo.8")]
        );
        // A directory whose name matches is only a subdirectory, never a match
        assert_eq!(
            sorted(result.subdirectories),
            vec![root.join("bin"), root.join("sudoers.d")]
        );
    }

    #[test]
    fn test_scan_is_case_sensitive() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("SUDO_NOTES"), "").unwrap();
        let result = scan_dir(temp.path(), "sudo").into_result();
        assert!(result.matched_files.is_empty());
    }

    #[test]
    fn test_empty_pattern_matches_every_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a"), "").unwrap();
        fs::write(temp.path().join("b"), "").unwrap();
        let result = scan_dir(temp.path(), "").into_result();
        assert_eq!(result.matched_files.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_skips_symlinks() {
        use std::os::unix::fs::symlink;

        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("target.txt"), "").unwrap();
        fs::create_dir(root.join("real")).unwrap();
        symlink(root.join("target.txt"), root.join("sudo_link")).unwrap();
        symlink(root.join("real"), root.join("sudo_dir_link")).unwrap();

        let result = scan_dir(root, "sudo").into_result();
        assert!(result.matched_files.is_empty());
        assert_eq!(result.subdirectories, vec![root.join("real")]);
    }

    #[test]
    fn test_missing_dir_is_reported_as_failure() {
        let temp = TempDir::new().unwrap();
        let outcome = scan_dir(&temp.path().join("gone"), "sudo");
        assert!(matches!(outcome, DirScan::Failed(ref e) if e.kind() == io::ErrorKind::NotFound));
        assert!(!outcome.is_tolerated());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_is_tolerated() {
        use std::os::unix::fs::symlink;

        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        symlink(&b, &a).unwrap();
        symlink(&a, &b).unwrap();

        // Opening a path through a link cycle fails with ELOOP
        let outcome = scan_dir(&a, "sudo");
        assert!(matches!(outcome, DirScan::ExcessiveLinkDepth));
        assert!(outcome.is_tolerated());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_dir_is_access_denied() {
        use std::os::unix::fs::PermissionsExt;

        if unsafe { libc::geteuid() } == 0 {
            // root bypasses directory permissions
            return;
        }

        let temp = TempDir::new().unwrap();
        let locked = temp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("sudo_secret"), "").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let outcome = scan_dir(&locked, "sudo");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(outcome, DirScan::AccessDenied));
        assert!(outcome.into_result().is_empty());
    }

    #[test]
    fn test_descend_filter_drops_subdirectories() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("keep")).unwrap();
        fs::create_dir(temp.path().join("proc")).unwrap();

        let result =
            scan_dir_with(temp.path(), "sudo", |e| e.file_name() != "proc").into_result();
        assert_eq!(result.subdirectories, vec![temp.path().join("keep")]);
    }
}
