use std::io::{self, Stderr, Write};

use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use sudoscan_core::ScanProgress;

/// Braille spinner characters
const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Single status line redrawn in place while the walk runs
pub struct ProgressLine<W: Write> {
    out: W,
    spinner_frame: usize,
    drawn: bool,
}

impl ProgressLine<Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> ProgressLine<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            spinner_frame: 0,
            drawn: false,
        }
    }

    /// Advance the spinner and redraw with the latest numbers
    pub fn tick(&mut self, progress: &ScanProgress) -> io::Result<()> {
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
        let line = format_progress(progress, self.spinner_frame);
        queue!(
            self.out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(line)
        )?;
        self.drawn = true;
        self.out.flush()
    }

    /// Wipe the line so regular output starts on a clean row
    pub fn clear(&mut self) -> io::Result<()> {
        if !self.drawn {
            return Ok(());
        }
        queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        self.drawn = false;
        self.out.flush()
    }
}

/// Status text, e.g. `⠙ round 4  1,024/3,000 dirs  7 matches`
pub fn format_progress(progress: &ScanProgress, spinner_frame: usize) -> String {
    let spinner = SPINNER[spinner_frame % SPINNER.len()];
    let mut line = format!(
        "{} round {}  {}/{} dirs  {} matches",
        spinner,
        progress.round + 1,
        group_digits(progress.dirs_scanned),
        group_digits(progress.dirs_known),
        group_digits(progress.matches_found),
    );
    if progress.dirs_skipped > 0 {
        line.push_str(&format!("  {} skipped", group_digits(progress.dirs_skipped)));
    }
    if progress.errors > 0 {
        line.push_str(&format!("  {} errors", group_digits(progress.errors)));
    }
    line
}

/// Thousands separators, e.g. 1234567 -> "1,234,567"
fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let head = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    out.push_str(&digits[..head]);
    for chunk in digits.as_bytes()[head..].chunks(3) {
        if !out.is_empty() {
            out.push(',');
        }
        // chunks of an ASCII string stay valid UTF-8
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(1000), "1,000");
        assert_eq!(group_digits(12345), "12,345");
        assert_eq!(group_digits(123456), "123,456");
        assert_eq!(group_digits(1234567), "1,234,567");
    }

    #[test]
    fn test_format_progress() {
        let progress = ScanProgress {
            round: 3,
            dirs_scanned: 1024,
            dirs_known: 3000,
            matches_found: 7,
            ..Default::default()
        };
        assert_eq!(
            format_progress(&progress, 1),
            "⠙ round 4  1,024/3,000 dirs  7 matches"
        );

        let progress = ScanProgress {
            dirs_skipped: 2,
            errors: 1,
            ..progress
        };
        assert!(format_progress(&progress, 0).ends_with("7 matches  2 skipped  1 errors"));
    }

    #[test]
    fn test_clear_without_draw_writes_nothing() {
        let mut line = ProgressLine::new(Vec::new());
        line.clear().unwrap();
        assert!(line.out.is_empty());
    }

    #[test]
    fn test_tick_writes_status() {
        let mut line = ProgressLine::new(Vec::new());
        line.tick(&ScanProgress::default()).unwrap();
        let written = String::from_utf8(line.out.clone()).unwrap();
        assert!(written.contains("round 1  0/0 dirs  0 matches"));
    }
}
