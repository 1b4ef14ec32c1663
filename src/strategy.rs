//! Read-strategy selection.
//!
//! Small files are cheapest to read whole; large files use the backward
//! scanner so memory stays bounded by the buffer size. The split point is
//! `TailConfig::small_file_threshold`.

use crate::config::TailConfig;
use crate::encoding::Encoding;
use crate::error::{Error, Result};
use crate::tail::{FileLine, read_tail};
use std::path::Path;
use std::sync::Arc;

/// One way of producing the tail of a file. The two built-ins cover the
/// whole size domain between them; a caller-supplied set that leaves a gap
/// surfaces as `Error::Configuration` at read time.
pub trait ReadStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this strategy applies to a file of `file_size` bytes under
    /// the given threshold.
    fn handles(&self, file_size: u64, threshold: u64) -> bool;

    fn read(&self, path: &Path, line_count: usize, config: &TailConfig) -> Result<Vec<FileLine>>;
}

/// Chunked reverse scan from end-of-file. Applies above the threshold.
pub struct BackwardScan;

impl ReadStrategy for BackwardScan {
    fn name(&self) -> &'static str {
        "backward-scan"
    }

    fn handles(&self, file_size: u64, threshold: u64) -> bool {
        file_size > threshold
    }

    fn read(&self, path: &Path, line_count: usize, config: &TailConfig) -> Result<Vec<FileLine>> {
        read_tail(path, line_count, config.buffer_size, config.encoding)
    }
}

/// Load-everything strategy for files at or below the threshold.
pub struct WholeFile;

impl ReadStrategy for WholeFile {
    fn name(&self) -> &'static str {
        "whole-file"
    }

    fn handles(&self, file_size: u64, threshold: u64) -> bool {
        file_size <= threshold
    }

    fn read(&self, path: &Path, line_count: usize, config: &TailConfig) -> Result<Vec<FileLine>> {
        if line_count == 0 {
            return Err(Error::invalid_argument("line count must be at least 1"));
        }
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::not_found(path)
            } else {
                Error::Io(e)
            }
        })?;

        let data = strip_bom(&bytes, config.encoding);
        let text = config.encoding.decode(data)?;

        // Same line rule as the backward scanner: a line is a non-empty
        // segment between line feeds, judged before the trailing CR is
        // dropped.
        let segments: Vec<&str> = text.split('\n').filter(|s| !s.is_empty()).collect();
        let total = segments.len();
        let returned = total.min(line_count);
        let start = total - returned + 1;

        Ok(segments[total - returned..]
            .iter()
            .enumerate()
            .map(|(i, segment)| FileLine {
                number: (start + i) as u64,
                content: segment.strip_suffix('\r').unwrap_or(segment).to_string(),
            })
            .collect())
    }
}

fn strip_bom(bytes: &[u8], encoding: Encoding) -> &[u8] {
    let bom = encoding.bom();
    if !bom.is_empty() && bytes.starts_with(bom) {
        &bytes[bom.len()..]
    } else {
        bytes
    }
}

/// Reads file tails through whichever strategy matches the file size.
pub struct TailReader {
    config: TailConfig,
    strategies: Vec<Box<dyn ReadStrategy>>,
}

impl TailReader {
    /// A reader with the two built-in strategies.
    pub fn new(config: TailConfig) -> Self {
        Self::with_strategies(config, vec![Box::new(WholeFile), Box::new(BackwardScan)])
    }

    /// A reader with a caller-supplied strategy set, tried in order.
    pub fn with_strategies(config: TailConfig, strategies: Vec<Box<dyn ReadStrategy>>) -> Self {
        Self { config, strategies }
    }

    pub fn config(&self) -> &TailConfig {
        &self.config
    }

    /// Read the last `line_count` lines of `path`, oldest first.
    pub fn read_last_lines(
        &self,
        path: impl AsRef<Path>,
        line_count: usize,
    ) -> Result<Vec<FileLine>> {
        let path = path.as_ref();
        if line_count == 0 {
            return Err(Error::invalid_argument("line count must be at least 1"));
        }
        if !path.exists() {
            return Err(Error::not_found(path));
        }

        let file_size = std::fs::metadata(path)?.len();
        let strategy = self
            .strategies
            .iter()
            .find(|s| s.handles(file_size, self.config.small_file_threshold))
            .ok_or_else(|| Error::Configuration {
                path: path.display().to_string(),
            })?;

        tracing::debug!(
            path = %path.display(),
            file_size,
            strategy = strategy.name(),
            "strategy selected"
        );

        strategy.read(path, line_count, &self.config)
    }

    /// Asynchronous variant; the blocking read runs on the tokio blocking
    /// thread pool.
    pub async fn read_last_lines_async(
        self: &Arc<Self>,
        path: impl AsRef<Path>,
        line_count: usize,
    ) -> Result<Vec<FileLine>> {
        let reader = Arc::clone(self);
        let path = path.as_ref().to_path_buf();
        tokio::task::spawn_blocking(move || reader.read_last_lines(&path, line_count))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?
    }
}
