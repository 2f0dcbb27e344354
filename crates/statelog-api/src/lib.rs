//! # statelog
//!
//! A single-file write-ahead log for acknowledgement state.
//!
//! Producers append records (a state tag plus caller-defined key and value
//! bytes) and get back a handle. Consumers later use the handle to flip the
//! record's state, e.g. from `New` to `Processed`, rewriting one byte in
//! place. Once `max_record_count` records are live, the next append starts a
//! new layer and the oldest record becomes read-only.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use statelog::{EntryState, LogEntry, WalConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WalConfig::new("./acks.wal").with_max_record_count(10_000);
//!     let writer = statelog::open_writer(&config)?;
//!
//!     let handle = writer.append(LogEntry::fresh(b"order-17".to_vec(), b"{}".to_vec()))?;
//!     writer.update_state(&handle, EntryState::Processed)?;
//!     writer.close()?;
//!
//!     for entry in statelog::open_reader(&config)? {
//!         let entry = entry?;
//!         println!("{} -> {:?}", String::from_utf8_lossy(&entry.key), entry.entry_state);
//!     }
//!     Ok(())
//! }
//! ```

pub mod logging;

// Re-export core types
pub use statelog_core::{Error, Result};

// Log engine components
pub use statelog_wal::{
    can_update, CachedEntryInfo, DefaultLogSupervisor, EntryInfo, EntryState, FlushHandle,
    Header, LayerInfo, LogEntry, LogReader, LogRecovery, LogSupervisor, LogWriter,
    ManualLogSupervisor, PersistedLogEntry, RecoveryStats, TransactionLog, WalConfig,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Open a writer for `config` with a background flush supervisor
pub fn open_writer(config: &WalConfig) -> Result<LogWriter> {
    tracing::info!(
        path = %config.log_path.display(),
        max_record_count = config.max_record_count,
        flush_interval_ms = config.flush_interval_ms,
        "opening state log"
    );
    LogWriter::from_config(config)
}

/// Open a reader on the log described by `config`
pub fn open_reader(config: &WalConfig) -> Result<LogReader> {
    config.reader()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_open_writer_rejects_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = WalConfig::new(temp_dir.path().join("acks.wal")).with_max_record_count(0);
        assert!(matches!(open_writer(&config), Err(Error::InvalidOperation(_))));
    }

    #[test]
    fn test_open_writer_and_reader() {
        let temp_dir = TempDir::new().unwrap();
        let config = WalConfig::new(temp_dir.path().join("acks.wal")).with_flush_interval_ms(20);

        let writer = open_writer(&config).unwrap();
        writer.append(LogEntry::fresh(b"a".to_vec(), b"1".to_vec())).unwrap();
        writer.close().unwrap();

        let entries = open_reader(&config).unwrap().read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry_state, EntryState::New);
    }
}
