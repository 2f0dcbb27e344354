//! # statelog WAL (Write-Ahead Log)
//!
//! Single-file, append-only log of state records with in-place state
//! updates, count-based roll-over and background flushing.
//!
//! ## ⚠️ Internal Implementation Detail
//!
//! **This crate is an internal implementation detail of statelog.**
//!
//! Users should depend on the main [`statelog`](https://crates.io/crates/statelog) crate
//! instead, which provides the stable public API. This crate's API may change
//! without notice between minor versions.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header: format name (16, space padded) │ file version (u32)  │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Record: state │ key meta │ value meta │ key len │ key │      │
//! │         value len │ value │ crc32                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Record ...                                                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use statelog_core::{Error, Result};
use std::path::PathBuf;

pub mod entry;
pub mod entry_info;
pub mod header;
pub mod reader;
pub mod recovery;
pub mod sink;
pub mod supervisor;
pub mod transaction_log;
pub mod writer;

pub use entry::{EntryState, LogEntry, PersistedLogEntry};
pub use entry_info::{CachedEntryInfo, EntryInfo, LayerInfo};
pub use header::Header;
pub use reader::LogReader;
pub use recovery::{LogRecovery, RecoveryStats};
pub use sink::RandomAccessSink;
pub use supervisor::{DefaultLogSupervisor, FlushHandle, LogSupervisor, ManualLogSupervisor};
pub use transaction_log::{can_update, TransactionLog};
pub use writer::LogWriter;

/// Default roll-over threshold, in records
pub const DEFAULT_MAX_RECORD_COUNT: usize = 100_000;

/// Default interval between background flushes
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1000;

/// WAL configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalConfig {
    /// Path of the log file
    pub log_path: PathBuf,
    /// Live records kept before a roll-over starts a new layer
    pub max_record_count: usize,
    /// Interval of the background flush in milliseconds
    pub flush_interval_ms: u64,
    /// Sizing hint for readers
    pub read_buffer_entries: usize,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("statelog.wal"),
            max_record_count: DEFAULT_MAX_RECORD_COUNT,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            read_buffer_entries: 1024,
        }
    }
}

impl WalConfig {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            ..Default::default()
        }
    }

    pub fn with_max_record_count(mut self, count: usize) -> Self {
        self.max_record_count = count;
        self
    }

    pub fn with_flush_interval_ms(mut self, interval_ms: u64) -> Self {
        self.flush_interval_ms = interval_ms;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_record_count == 0 {
            return Err(Error::InvalidOperation(
                "max_record_count must be at least 1".to_string(),
            ));
        }
        if self.flush_interval_ms == 0 {
            return Err(Error::InvalidOperation(
                "flush_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Open a reader on the configured log
    pub fn reader(&self) -> Result<LogReader> {
        LogReader::open(&self.log_path, self.read_buffer_entries)
    }
}
