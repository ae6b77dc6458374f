// Run with: cargo run -p sudoscan-core --example debug_walk -- /path/to/walk [pattern]

use std::path::PathBuf;
use std::time::Instant;

use sudoscan_core::{ScanConfig, ScanMessage, Walker};

fn main() {
    let mut args = std::env::args().skip(1);
    let path = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    let pattern = args.next().unwrap_or_else(|| "sudo".to_string());

    println!("Walking: {:?} (pattern {:?})", path, pattern);

    let walker = Walker::new(ScanConfig::with_pattern(pattern));
    let (rx, handle) = walker.spawn(path);

    let start = Instant::now();

    for msg in rx {
        let elapsed = start.elapsed().as_secs_f64();
        match msg {
            ScanMessage::Started(root) => {
                println!("[{:>6.1}s] STARTED {}", elapsed, root.display());
            }
            ScanMessage::Progress(p) => {
                println!(
                    "[{:>6.1}s] round={:<4} this_round={:<8} scanned={:<8} known={:<8} skipped={:<6} matches={:<6} errors={}",
                    elapsed,
                    p.round,
                    p.dirs_completed_this_round,
                    p.dirs_scanned,
                    p.dirs_known,
                    p.dirs_skipped,
                    p.matches_found,
                    p.errors,
                );
            }
            ScanMessage::Error(failure) => {
                println!("[{:>6.1}s] ERROR: {}", elapsed, failure);
            }
            ScanMessage::Completed => {
                println!("[{:>6.1}s] COMPLETED", elapsed);
            }
            ScanMessage::Cancelled => {
                println!("[{:>6.1}s] CANCELLED", elapsed);
            }
        }
    }

    match handle.join().unwrap() {
        Ok(outcome) => println!(
            "\nFinal: {} matches, {} failures",
            outcome.matches.len(),
            outcome.failures.len()
        ),
        Err(e) => println!("\nWalk failed: {}", e),
    }
}
