// Common test utilities for log integration tests

use statelog_wal::{LogEntry, LogReader, PersistedLogEntry};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test fixture that owns a temporary directory for one log file
pub struct LogTestFixture {
    #[allow(dead_code)]
    pub temp_dir: TempDir,
    pub log_path: PathBuf,
}

impl LogTestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let log_path = temp_dir.path().join("state.wal");

        Self { temp_dir, log_path }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    #[allow(dead_code)]
    pub fn read_all(&self) -> Vec<PersistedLogEntry> {
        let mut reader = LogReader::open(&self.log_path, 1024).expect("Failed to open reader");
        reader.read_all().expect("Failed to read log")
    }
}

impl Default for LogTestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry with a numbered key and value
#[allow(dead_code)]
pub fn numbered_entry(i: usize) -> LogEntry {
    LogEntry::fresh(
        format!("key{}", i).into_bytes(),
        format!("value{}", i).into_bytes(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_path_is_inside_temp_dir() {
        let fixture = LogTestFixture::new();
        assert!(fixture.log_path().starts_with(fixture.temp_dir.path()));
        assert!(!fixture.log_path().exists());
    }
}
