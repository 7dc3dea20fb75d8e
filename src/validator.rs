//! Record validation and run statistics.

use serde::Serialize;

use crate::parsers::Record;

/// Line and file tallies for a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Rows with the expected field count
    pub good_lines: u64,
    /// Rows rejected for a field count mismatch
    pub bad_lines: u64,
    /// Files whose rows were analyzed
    pub files_processed: u64,
    /// Files that could not be loaded
    pub files_skipped: u64,
}

impl Stats {
    pub fn total_lines(&self) -> u64 {
        self.good_lines + self.bad_lines
    }
}

/// Check a row against the header width and tally the result
///
/// Returns whether the row may be handed to the analyzers. Rows with fewer
/// or more fields than the header are rejected.
pub fn validate_record(stats: &mut Stats, record: &Record, width: usize) -> bool {
    if record.len() != width {
        stats.bad_lines += 1;
        return false;
    }
    stats.good_lines += 1;
    true
}

/// Tally blank lines the tokenizer dropped as rejected rows
pub fn reject_blank_lines(stats: &mut Stats, count: usize) {
    stats.bad_lines += count as u64;
}
