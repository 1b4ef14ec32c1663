//! Test utilities for creating temporary files with known content.

#[cfg(test)]
use std::fs::{File, OpenOptions};
#[cfg(test)]
use std::io::Write;
#[cfg(test)]
use std::path::{Path, PathBuf};

#[cfg(test)]
pub struct TempLogFile {
    pub path: PathBuf,
    _temp_dir: tempfile::TempDir,
}

#[cfg(test)]
impl TempLogFile {
    /// Create a new, empty temporary log file.
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("test.log");

        File::create(&path)?;

        Ok(Self {
            path,
            _temp_dir: temp_dir,
        })
    }

    /// Create a temporary log file with exact byte content.
    pub fn with_bytes(bytes: &[u8]) -> std::io::Result<Self> {
        let temp_file = Self::new()?;
        std::fs::write(&temp_file.path, bytes)?;
        Ok(temp_file)
    }

    /// Append one line (a trailing newline is added) to the file.
    pub fn append_line(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;

        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }

    /// Delete the file while keeping the containing directory alive.
    pub fn delete(&self) -> std::io::Result<()> {
        std::fs::remove_file(&self.path)
    }

    /// Get the path to the temporary file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_log_file_creation() {
        let temp_file = TempLogFile::new().unwrap();
        assert!(temp_file.path().exists());
    }

    #[test]
    fn test_temp_log_file_with_bytes() {
        let temp_file = TempLogFile::with_bytes(b"one\ntwo\n").unwrap();

        let content = std::fs::read(temp_file.path()).unwrap();
        assert_eq!(content, b"one\ntwo\n");
    }

    #[test]
    fn test_append_line() {
        let temp_file = TempLogFile::new().unwrap();
        temp_file.append_line("line 1").unwrap();
        temp_file.append_line("line 2").unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert_eq!(content, "line 1\nline 2\n");
    }

    #[test]
    fn test_delete() {
        let temp_file = TempLogFile::with_bytes(b"gone soon").unwrap();
        temp_file.delete().unwrap();
        assert!(!temp_file.path().exists());
    }
}
