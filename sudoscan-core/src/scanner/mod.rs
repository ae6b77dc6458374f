mod dir;
mod progress;
mod walker;

pub use dir::{DirScan, DirTask, ScanResult, scan_dir};
pub use progress::{ScanFailure, ScanMessage, ScanProgress};
pub use walker::{
    CancellationToken, DEFAULT_PATTERN, ScanConfig, WalkOutcome, Walker, find_matching_files,
};
