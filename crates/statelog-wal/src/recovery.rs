// Log recovery - replay after a crash or restart
//
// Recovery reads every complete record of a log. A record cut short at the
// tail (a crash during append) ends the replay and is reported in the stats;
// any other corruption is still an error. Callers typically re-drive the
// `New` records returned by `pending`.

use crate::entry::{EntryState, PersistedLogEntry};
use crate::reader::LogReader;
use statelog_core::Result;
use std::path::Path;

/// Summary of a log replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    pub total_entries: u64,
    pub new_entries: u64,
    pub processed_entries: u64,
    pub failed_entries: u64,
    /// The last record in the file was incomplete
    pub truncated_tail: bool,
}

impl RecoveryStats {
    fn record(&mut self, entry: &PersistedLogEntry) {
        self.total_entries += 1;
        match entry.entry_state {
            EntryState::New => self.new_entries += 1,
            EntryState::Processed => self.processed_entries += 1,
            EntryState::Failed => self.failed_entries += 1,
        }
    }
}

/// Replays a log file tolerating a truncated tail
pub struct LogRecovery;

impl LogRecovery {
    /// Read every complete record
    pub fn recover(path: impl AsRef<Path>) -> Result<(Vec<PersistedLogEntry>, RecoveryStats)> {
        let mut entries = Vec::new();
        let stats = Self::replay(path.as_ref(), |entry| entries.push(entry))?;
        Ok((entries, stats))
    }

    /// Records still in the `New` state
    pub fn pending(path: impl AsRef<Path>) -> Result<Vec<PersistedLogEntry>> {
        let mut pending = Vec::new();
        Self::replay(path.as_ref(), |entry| {
            if entry.entry_state == EntryState::New {
                pending.push(entry);
            }
        })?;
        Ok(pending)
    }

    /// Check a log without keeping its records
    pub fn verify(path: impl AsRef<Path>) -> Result<RecoveryStats> {
        Self::replay(path.as_ref(), |_| {})
    }

    fn replay<F>(path: &Path, mut visit: F) -> Result<RecoveryStats>
    where
        F: FnMut(PersistedLogEntry),
    {
        let mut reader = LogReader::open(path, 0)?;
        let mut stats = RecoveryStats::default();

        loop {
            match reader.read_entry() {
                Ok(Some(entry)) => {
                    stats.record(&entry);
                    visit(entry);
                }
                Ok(None) => break,
                Err(e) if e.is_truncation() => {
                    tracing::warn!(
                        path = %path.display(),
                        complete_entries = stats.total_entries,
                        error = %e,
                        "log ends with a truncated record"
                    );
                    stats.truncated_tail = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(stats)
    }
}
