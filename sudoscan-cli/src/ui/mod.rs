pub mod listing;
pub mod progress;

pub use listing::write_partition;
pub use progress::ProgressLine;
