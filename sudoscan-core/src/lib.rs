pub mod error;
pub mod owner;
pub mod scanner;

pub use error::{Result, SudoscanError};
pub use owner::{OwnershipPartition, ROOT_UID, classify_by_owner};
pub use scanner::{
    CancellationToken, DEFAULT_PATTERN, DirScan, DirTask, ScanConfig, ScanFailure, ScanMessage,
    ScanProgress, ScanResult, WalkOutcome, Walker, find_matching_files, scan_dir,
};
