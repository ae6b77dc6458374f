use std::any::Any;
use std::fs::DirEntry;
use std::io;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, trace, warn};

use super::dir::{DirScan, DirTask, scan_dir_with};
use super::progress::{ScanFailure, ScanMessage, ScanProgress};
use crate::error::{Result, SudoscanError};

/// Default file name pattern
pub const DEFAULT_PATTERN: &str = "sudo";

/// Walker configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Substring a file name must contain to match
    pub pattern: String,
    /// Number of worker threads (0 = auto)
    pub num_threads: usize,
    /// Stay on the root's filesystem (don't cross mount points)
    pub same_filesystem: bool,
    /// Don't descend into /proc, /sys or /dev
    pub skip_virtual: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            num_threads: 0, // auto
            same_filesystem: false,
            skip_virtual: false,
        }
    }
}

impl ScanConfig {
    pub fn with_pattern(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    /// Worker count actually used: a small multiple of the hardware
    /// parallelism when set to auto, never zero.
    pub fn worker_count(&self) -> usize {
        if self.num_threads > 0 {
            return self.num_threads;
        }
        thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
            * 2
    }
}

/// Cancellation token for stopping walks between rounds
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a finished walk found
#[derive(Debug, Clone, Default)]
pub struct WalkOutcome {
    /// Matching files, in the order their directories completed
    pub matches: Vec<PathBuf>,
    /// Directories that failed unexpectedly, in the order they were reported
    pub failures: Vec<ScanFailure>,
    /// Final statistics
    pub progress: ScanProgress,
}

/// Pseudo filesystems that are huge, volatile, or both
const VIRTUAL_ROOTS: &[&str] = &["/proc", "/sys", "/dev"];

/// Decides which discovered subdirectories get enqueued
#[derive(Debug)]
struct DescendPolicy {
    root_device: Option<u64>,
    skip_virtual: bool,
}

impl DescendPolicy {
    fn new(config: &ScanConfig, root_path: &Path) -> Self {
        let root_device = if config.same_filesystem {
            std::fs::metadata(root_path).ok().map(|m| get_device_id(&m))
        } else {
            None
        };
        Self {
            root_device,
            skip_virtual: config.skip_virtual,
        }
    }

    fn allows(&self, entry: &DirEntry) -> bool {
        // A virtual root is only discovered as a child when the walk started above it
        if self.skip_virtual {
            let path = entry.path();
            if VIRTUAL_ROOTS.iter().any(|v| path == Path::new(v)) {
                return false;
            }
        }

        if let Some(root_device) = self.root_device
            && let Ok(meta) = entry.metadata()
            && get_device_id(&meta) != root_device
        {
            return false;
        }

        true
    }
}

/// What a worker sends back for each task it took
enum TaskOutcome {
    Scanned(DirScan),
    Panicked(String),
    Skipped,
}

struct Completion {
    task: DirTask,
    outcome: TaskOutcome,
}

/// Fixed set of threads listing directories from a shared queue.
///
/// Workers compete for tasks on one channel, so a slow directory never holds
/// up the others. Dropping the pool closes the queue and joins every thread.
struct WorkerPool {
    task_tx: Option<Sender<DirTask>>,
    done_rx: Receiver<Completion>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    fn spawn<F>(size: usize, scan: F, cancel_token: CancellationToken) -> io::Result<Self>
    where
        F: Fn(&DirTask) -> DirScan + Send + Sync + 'static,
    {
        let (task_tx, task_rx) = crossbeam_channel::unbounded::<DirTask>();
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<Completion>();
        let scan = Arc::new(scan);

        let mut pool = Self {
            task_tx: Some(task_tx),
            done_rx,
            handles: Vec::with_capacity(size),
        };

        for index in 0..size.max(1) {
            let task_rx = task_rx.clone();
            let done_tx = done_tx.clone();
            let scan = Arc::clone(&scan);
            let cancel_token = cancel_token.clone();

            // On error the partially built pool is dropped, which joins what started
            let handle = thread::Builder::new()
                .name(format!("sudoscan-worker-{index}"))
                .spawn(move || {
                    for task in task_rx {
                        let outcome = if cancel_token.is_cancelled() {
                            TaskOutcome::Skipped
                        } else {
                            match panic::catch_unwind(AssertUnwindSafe(|| scan(&task))) {
                                Ok(listing) => TaskOutcome::Scanned(listing),
                                Err(payload) => TaskOutcome::Panicked(panic_message(payload)),
                            }
                        };

                        if done_tx.send(Completion { task, outcome }).is_err() {
                            break;
                        }
                    }
                })?;
            pool.handles.push(handle);
        }

        Ok(pool)
    }

    fn submit(&self, task: DirTask) -> Result<()> {
        self.task_tx
            .as_ref()
            .and_then(|tx| tx.send(task).ok())
            .ok_or_else(|| pool_gone("task queue closed"))
    }

    fn next_completion(&self) -> Result<Completion> {
        self.done_rx
            .recv()
            .map_err(|_| pool_gone("all workers exited"))
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.task_tx.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn pool_gone(reason: &str) -> SudoscanError {
    SudoscanError::Io(io::Error::other(format!("worker pool stopped: {reason}")))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("worker panicked: {s}")
    } else {
        "worker panicked".to_string()
    }
}

/// Round-based parallel directory walker.
///
/// Each round dispatches the whole frontier to the worker pool and folds the
/// completions back in on the calling thread, which is the only place the
/// match list and the next frontier are touched. The walk ends after a round
/// that discovers no new directories.
pub struct Walker {
    config: ScanConfig,
    cancel_token: CancellationToken,
}

impl Walker {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Walk in the background.
    /// Returns a receiver for progress updates and the walker thread's handle.
    pub fn spawn(
        self,
        root_path: PathBuf,
    ) -> (Receiver<ScanMessage>, JoinHandle<Result<WalkOutcome>>) {
        let (tx, rx) = crossbeam_channel::unbounded();

        let handle = thread::spawn(move || self.walk_with(&root_path, Some(&tx)));

        (rx, handle)
    }

    /// Walk on the calling thread, without progress updates
    pub fn walk(&self, root_path: &Path) -> Result<WalkOutcome> {
        self.walk_with(root_path, None)
    }

    fn walk_with(&self, root_path: &Path, tx: Option<&Sender<ScanMessage>>) -> Result<WalkOutcome> {
        check_root(root_path)?;

        let pattern = self.config.pattern.clone();
        let policy = DescendPolicy::new(&self.config, root_path);
        let scan = move |task: &DirTask| scan_dir_with(&task.path, &pattern, |e| policy.allows(e));

        self.run(root_path, scan, tx)
    }

    fn run<F>(
        &self,
        root_path: &Path,
        scan: F,
        tx: Option<&Sender<ScanMessage>>,
    ) -> Result<WalkOutcome>
    where
        F: Fn(&DirTask) -> DirScan + Send + Sync + 'static,
    {
        let started = Instant::now();
        let workers = self.config.worker_count();
        let pool = WorkerPool::spawn(workers, scan, self.cancel_token.clone())?;

        // Progress is advisory: a dropped receiver never affects the walk
        let notify = |msg: ScanMessage| {
            if let Some(tx) = tx {
                let _ = tx.send(msg);
            }
        };

        notify(ScanMessage::Started(root_path.to_path_buf()));
        debug!(root = %root_path.display(), workers, pattern = %self.config.pattern, "walk started");

        let mut outcome = WalkOutcome::default();
        outcome.progress.dirs_known = 1;
        let mut frontier = vec![DirTask::new(root_path)];

        while !frontier.is_empty() {
            if self.cancel_token.is_cancelled() {
                debug!(round = outcome.progress.round, "walk cancelled");
                notify(ScanMessage::Cancelled);
                return Err(SudoscanError::Cancelled);
            }

            let dispatched = frontier.len();
            for task in frontier.drain(..) {
                pool.submit(task)?;
            }

            let mut next_frontier = Vec::new();
            let mut listed = 0u64;
            for _ in 0..dispatched {
                let Completion { task, outcome: task_outcome } = pool.next_completion()?;
                let progress = &mut outcome.progress;

                match task_outcome {
                    TaskOutcome::Scanned(DirScan::Listed(result)) => {
                        progress.matches_found += result.matched_files.len() as u64;
                        outcome.matches.extend(result.matched_files);
                        next_frontier.extend(result.subdirectories.into_iter().map(DirTask::new));
                    }
                    TaskOutcome::Scanned(DirScan::AccessDenied) => {
                        trace!(path = %task.path.display(), "permission denied, skipping");
                        progress.dirs_skipped += 1;
                    }
                    TaskOutcome::Scanned(DirScan::ExcessiveLinkDepth) => {
                        trace!(path = %task.path.display(), "too many levels of symbolic links, skipping");
                        progress.dirs_skipped += 1;
                    }
                    TaskOutcome::Scanned(DirScan::Failed(err)) => {
                        let failure = ScanFailure::new(task.path, err.to_string());
                        report_failure(&mut outcome, failure, &notify);
                    }
                    TaskOutcome::Panicked(message) => {
                        let failure = ScanFailure::new(task.path, message);
                        report_failure(&mut outcome, failure, &notify);
                    }
                    // Dropped after a cancel, never listed
                    TaskOutcome::Skipped => continue,
                }

                listed += 1;
                outcome.progress.dirs_scanned += 1;
            }

            let progress = &mut outcome.progress;
            progress.round += 1;
            progress.dirs_completed_this_round = listed;
            progress.dirs_known += next_frontier.len() as u64;
            debug!(
                round = progress.round,
                dispatched,
                discovered = next_frontier.len(),
                matches = progress.matches_found,
                "round finished"
            );
            notify(ScanMessage::Progress(progress.clone()));

            frontier = next_frontier;
        }

        // Tasks skipped by a cancel during the last round leave an empty frontier
        if self.cancel_token.is_cancelled() {
            notify(ScanMessage::Cancelled);
            return Err(SudoscanError::Cancelled);
        }

        info!(
            root = %root_path.display(),
            rounds = outcome.progress.round,
            dirs = outcome.progress.dirs_scanned,
            skipped = outcome.progress.dirs_skipped,
            matches = outcome.matches.len(),
            errors = outcome.failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "walk completed"
        );
        notify(ScanMessage::Completed);

        Ok(outcome)
    }
}

fn report_failure<N>(outcome: &mut WalkOutcome, failure: ScanFailure, notify: &N)
where
    N: Fn(ScanMessage),
{
    warn!(path = %failure.path.display(), error = %failure.message, "directory scan failed");
    outcome.progress.errors += 1;
    notify(ScanMessage::Error(failure.clone()));
    outcome.failures.push(failure);
}

/// Reject roots that can't be walked at all before spawning any thread
fn check_root(root_path: &Path) -> Result<()> {
    match std::fs::metadata(root_path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(SudoscanError::NotADirectory(root_path.to_path_buf())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Err(SudoscanError::PathNotFound(root_path.to_path_buf()))
        }
        Err(err) => Err(err.into()),
    }
}

/// Find every regular file under `root_path` whose name contains `pattern`,
/// using the default worker pool.
pub fn find_matching_files(root_path: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let walker = Walker::new(ScanConfig::with_pattern(pattern));
    walker.walk(root_path).map(|outcome| outcome.matches)
}

/// Get device ID for same-filesystem checks
#[cfg(unix)]
fn get_device_id(metadata: &std::fs::Metadata) -> u64 {
    metadata.dev()
}

/// Get device ID (Windows - not supported, return 0)
#[cfg(not(unix))]
fn get_device_id(_metadata: &std::fs::Metadata) -> u64 {
    0
}
