//! Configuration for tail reads and file monitoring.

use crate::encoding::Encoding;
use std::time::Duration;

/// Tuning knobs for the tail reader and the watch loop. Plain data, passed
/// into constructors; there is no global registry.
#[derive(Debug, Clone)]
pub struct TailConfig {
    /// Files at or below this many bytes are read whole; larger files use
    /// the backward scanner.
    pub small_file_threshold: u64,
    /// Chunk size for backward buffer reads. Rounded up to a whole number
    /// of code units for multi-byte encodings.
    pub buffer_size: usize,
    /// How file bytes are decoded into text.
    pub encoding: Encoding,
    /// Wait after a change notification before re-reading, so a writer can
    /// finish its burst of appends.
    pub settle_delay: Duration,
    /// Wait before the single watch-infrastructure restart attempt.
    pub restart_delay: Duration,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            small_file_threshold: 1024 * 1024,
            buffer_size: 4096,
            encoding: Encoding::default(),
            settle_delay: Duration::from_millis(50),
            restart_delay: Duration::from_millis(500),
        }
    }
}
