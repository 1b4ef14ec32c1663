//! A tail reader library: the last N lines of a file without reading the
//! whole file, plus live monitoring that re-reads the tail on every change.
//!
//! Large files are scanned backwards from end-of-file in fixed-size buffers;
//! small files are read whole. Watching delivers one [`ChangeRecord`] per
//! detected change, with the change kind, a timestamp and the fresh tail.
//!
//! # Example
//!
//! ```rust,no_run
//! use tail_reader::{read_last_lines, watch_tail};
//! use tokio_stream::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     for line in read_last_lines("app.log", 10)? {
//!         println!("{:>6}  {}", line.number, line.content);
//!     }
//!
//!     let mut changes = watch_tail("app.log", 10).await?;
//!     while let Some(record) = changes.next().await {
//!         println!("{:?}: {} lines", record.kind, record.lines.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

mod config;
mod encoding;
mod error;
mod monitor;
mod strategy;
mod tail;
mod watcher;

#[cfg(test)]
mod test_helpers;

pub use config::TailConfig;
pub use encoding::Encoding;
pub use error::{Error, Result};
pub use monitor::{ChangeKind, ChangeRecord, ChangeStream, FileMonitor};
pub use strategy::{BackwardScan, ReadStrategy, TailReader, WholeFile};
pub use tail::FileLine;

use std::path::Path;
use std::sync::Arc;

/// Read the last `line_count` lines of a file with the default
/// configuration, oldest first with 1-based line numbers.
pub fn read_last_lines<P: AsRef<Path>>(path: P, line_count: usize) -> Result<Vec<FileLine>> {
    TailReader::new(TailConfig::default()).read_last_lines(path, line_count)
}

/// Like [`read_last_lines`] with an explicit configuration.
pub fn read_last_lines_with<P: AsRef<Path>>(
    config: TailConfig,
    path: P,
    line_count: usize,
) -> Result<Vec<FileLine>> {
    TailReader::new(config).read_last_lines(path, line_count)
}

/// Asynchronous variant of [`read_last_lines`]; the read runs on the
/// blocking thread pool.
pub async fn read_last_lines_async<P: AsRef<Path>>(
    path: P,
    line_count: usize,
) -> Result<Vec<FileLine>> {
    Arc::new(TailReader::new(TailConfig::default()))
        .read_last_lines_async(path, line_count)
        .await
}

/// Start watching a file and return a stream of [`ChangeRecord`]s, beginning
/// with an initial snapshot of the current tail. Dropping the stream stops
/// the watch session.
pub async fn watch_tail<P: AsRef<Path>>(path: P, line_count: usize) -> Result<ChangeStream> {
    watch_tail_with(TailConfig::default(), path, line_count).await
}

/// Like [`watch_tail`] with an explicit configuration.
pub async fn watch_tail_with<P: AsRef<Path>>(
    config: TailConfig,
    path: P,
    line_count: usize,
) -> Result<ChangeStream> {
    let mut monitor = FileMonitor::new(config);
    let receiver = monitor.start(path, line_count).await?;
    Ok(ChangeStream::new(monitor, receiver))
}
