mod ui;

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use crossbeam_channel::RecvTimeoutError;
use crossterm::tty::IsTty;
use sudoscan_core::{
    ScanConfig, ScanMessage, ScanProgress, WalkOutcome, Walker, classify_by_owner,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use ui::{ProgressLine, write_partition};

/// How often the spinner moves while a round is in flight
const TICK_RATE: Duration = Duration::from_millis(100);

/// sudoscan - find files by name and split them by owner
#[derive(Parser, Debug)]
#[command(name = "sudoscan")]
#[command(about = "Find files whose name contains a pattern and list them by owner (root or not)")]
#[command(version)]
struct Args {
    /// Directory to walk
    #[arg(default_value = "/")]
    path: PathBuf,

    /// Substring a file name must contain
    #[arg(short, long, default_value = "sudo")]
    pattern: String,

    /// Number of worker threads (0 = twice the CPU count)
    #[arg(short = 'j', long, default_value_t = 0)]
    threads: usize,

    /// Don't cross filesystem boundaries
    #[arg(short = 'x', long)]
    one_file_system: bool,

    /// Don't descend into /proc, /sys and /dev
    #[arg(long)]
    skip_virtual: bool,

    /// Sort each list by path before printing
    #[arg(short, long)]
    sort: bool,

    /// Hide the progress line
    #[arg(short, long)]
    quiet: bool,

    /// Log walk details to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    setup_logging(args.verbose);

    let config = ScanConfig {
        pattern: args.pattern.clone(),
        num_threads: args.threads,
        same_filesystem: args.one_file_system,
        skip_virtual: args.skip_virtual,
    };
    debug!(?config, path = %args.path.display(), "starting");

    // Progress and debug logs would fight over the same terminal line
    let show_progress = !args.quiet && !args.verbose && io::stderr().is_tty();

    let outcome = run_walk(Walker::new(config), args.path.clone(), show_progress, args.verbose)
        .wrap_err_with(|| format!("Failed to walk {}", args.path.display()))?;

    let mut partition = classify_by_owner(&outcome.matches);
    if args.sort {
        partition.privileged.sort();
        partition.other.sort();
    }

    let mut stdout = io::stdout().lock();
    write_partition(&mut stdout, &partition)?;
    stdout.flush()?;

    Ok(())
}

/// Drive the walker thread, keeping the progress line alive until it finishes
fn run_walk(
    walker: Walker,
    root: PathBuf,
    show_progress: bool,
    verbose: bool,
) -> Result<WalkOutcome> {
    let (rx, handle) = walker.spawn(root);
    let mut progress_line = show_progress.then(ProgressLine::stderr);
    let mut latest = ScanProgress::default();

    loop {
        match rx.recv_timeout(TICK_RATE) {
            Ok(ScanMessage::Progress(progress)) => latest = progress,
            Ok(ScanMessage::Error(failure)) => {
                // Already logged as a warning in verbose mode
                if !verbose {
                    if let Some(line) = progress_line.as_mut() {
                        line.clear()?;
                    }
                    eprintln!("{failure}");
                }
            }
            Ok(_) | Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if let Some(line) = progress_line.as_mut() {
            line.tick(&latest)?;
        }
    }

    if let Some(line) = progress_line.as_mut() {
        line.clear()?;
    }

    let outcome = handle
        .join()
        .map_err(|_| eyre!("walker thread panicked"))??;
    Ok(outcome)
}

fn setup_logging(verbose: bool) {
    // Unexpected scan failures are printed by the front end unless verbose
    let default_filter = if verbose {
        "sudoscan=debug,sudoscan_core=debug,warn"
    } else {
        "sudoscan_core=error,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["sudoscan"]);
        assert_eq!(args.path, PathBuf::from("/"));
        assert_eq!(args.pattern, "sudo");
        assert_eq!(args.threads, 0);
        assert!(!args.one_file_system);
    }

    #[test]
    fn test_flags() {
        let args = Args::parse_from([
            "sudoscan", "/etc", "-p", "shadow", "-j", "4", "-x", "-q", "-s",
        ]);
        assert_eq!(args.path, PathBuf::from("/etc"));
        assert_eq!(args.pattern, "shadow");
        assert_eq!(args.threads, 4);
        assert!(args.one_file_system);
        assert!(args.quiet);
        assert!(args.sort);
    }
}
