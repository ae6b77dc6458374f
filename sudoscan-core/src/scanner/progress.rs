use std::fmt;
use std::path::PathBuf;

/// Update sent from the walker thread to whoever is listening
#[derive(Debug, Clone)]
pub enum ScanMessage {
    /// Walk started at this root
    Started(PathBuf),
    /// A round finished
    Progress(ScanProgress),
    /// A directory could not be listed for an unexpected reason
    Error(ScanFailure),
    /// Walk finished, every reachable directory was listed
    Completed,
    /// Walk was cancelled between rounds
    Cancelled,
}

/// Walk statistics, refreshed once per round
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanProgress {
    /// Rounds completed so far
    pub round: u64,
    /// Directories listed in the round that just finished
    pub dirs_completed_this_round: u64,
    /// Directories listed since the walk started
    pub dirs_scanned: u64,
    /// Directories discovered so far, root included
    pub dirs_known: u64,
    /// Directories skipped for permission or link-depth reasons
    pub dirs_skipped: u64,
    /// Matching files found so far
    pub matches_found: u64,
    /// Directories that failed unexpectedly
    pub errors: u64,
}

impl ScanProgress {
    /// Directories discovered but not listed yet
    pub fn dirs_pending(&self) -> u64 {
        self.dirs_known.saturating_sub(self.dirs_scanned)
    }

    /// Share of known directories already listed, in `0.0..=1.0`
    pub fn fraction_done(&self) -> f64 {
        if self.dirs_known == 0 {
            0.0
        } else {
            self.dirs_scanned as f64 / self.dirs_known as f64
        }
    }
}

/// A directory whose listing failed for a reason other than permissions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub message: String,
}

impl ScanFailure {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ScanFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error scanning {}: {}", self.path.display(), self.message)
    }
}
