// Log reader - validates the header and replays records in order
//
// The reader is forward-only and restartable from the first record. A
// clean end of file yields `Ok(None)`; a record cut short yields
// `Error::Truncated`, and any other malformed framing is `Error::Corruption`.
// Reading a file while a writer is still appending to it is not supported.

use crate::entry::PersistedLogEntry;
use crate::header::Header;
use statelog_core::Result;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Upper bound on the pre-allocation made from the entries hint
const MAX_PREALLOCATED_ENTRIES: usize = 64 * 1024;

/// Reads records from a single log file
pub struct LogReader {
    path: PathBuf,
    reader: BufReader<File>,
    header: Header,
    max_entries: usize,
    entries_read: u64,
    /// Set after an error so iteration stops
    failed: bool,
}

impl LogReader {
    /// Open a log file and validate its header
    ///
    /// `max_entries` is a sizing hint for `read_all`; it does not limit
    /// how many records can be read.
    pub fn open(path: impl AsRef<Path>, max_entries: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut reader = BufReader::new(File::open(&path)?);
        let header = Header::read_from(&mut reader)?;

        tracing::debug!(
            path = %path.display(),
            version = header.file_version,
            "opened log reader"
        );

        Ok(Self {
            path,
            reader,
            header,
            max_entries,
            entries_read: 0,
            failed: false,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records returned since open (or the last reset)
    pub fn entries_read(&self) -> u64 {
        self.entries_read
    }

    /// Read the next record
    ///
    /// Returns `Ok(Some(entry))` for a complete record and `Ok(None)` at the
    /// end of the file.
    pub fn read_entry(&mut self) -> Result<Option<PersistedLogEntry>> {
        match PersistedLogEntry::read_from(&mut self.reader) {
            Ok(Some((entry, _))) => {
                self.entries_read += 1;
                Ok(Some(entry))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                self.failed = true;
                Err(e)
            }
        }
    }

    /// Rewind to the first record
    pub fn reset(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(Header::BYTES as u64))?;
        self.entries_read = 0;
        self.failed = false;
        Ok(())
    }

    /// Read all remaining records into a vector
    pub fn read_all(&mut self) -> Result<Vec<PersistedLogEntry>> {
        let mut entries = Vec::with_capacity(self.max_entries.min(MAX_PREALLOCATED_ENTRIES));
        while let Some(entry) = self.read_entry()? {
            entries.push(entry);
        }
        Ok(entries)
    }
}

impl Iterator for LogReader {
    type Item = Result<PersistedLogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.read_entry().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryState, LogEntry};
    use crate::{LogWriter, ManualLogSupervisor};
    use statelog_core::Error;
    use std::io::Write;
    use tempfile::TempDir;

    fn setup_test_log() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let log_path = temp_dir.path().join("state.log");
        (temp_dir, log_path)
    }

    fn write_entries(path: &Path, count: usize) {
        let writer = LogWriter::open(path, ManualLogSupervisor, 1024).expect("Failed to create writer");
        for i in 0..count {
            writer
                .append(LogEntry::new(
                    EntryState::New,
                    i as u32,
                    format!("key{}", i).into_bytes(),
                    1,
                    format!("value{}", i).into_bytes(),
                ))
                .expect("Failed to append");
        }
        writer.close().expect("Failed to close");
    }

    #[test]
    fn test_empty_log() {
        let (_temp_dir, log_path) = setup_test_log();
        write_entries(&log_path, 0);

        let mut reader = LogReader::open(&log_path, 0).expect("Failed to create reader");
        assert_eq!(reader.header().trimmed_name(), Header::FORMAT_NAME);
        assert!(reader.read_entry().unwrap().is_none());
    }

    #[test]
    fn test_read_multiple_entries() {
        let (_temp_dir, log_path) = setup_test_log();
        write_entries(&log_path, 10);

        let mut reader = LogReader::open(&log_path, 10).unwrap();
        let entries = reader.read_all().unwrap();

        assert_eq!(entries.len(), 10);
        assert_eq!(reader.entries_read(), 10);
        assert_eq!(entries[3].key, b"key3");
        assert_eq!(entries[3].key_metadata, 3);
        assert_eq!(entries[3].value_metadata, 1);
    }

    #[test]
    fn test_reader_reset() {
        let (_temp_dir, log_path) = setup_test_log();
        write_entries(&log_path, 5);

        let mut reader = LogReader::open(&log_path, 5).unwrap();
        assert_eq!(reader.read_all().unwrap().len(), 5);

        reader.reset().unwrap();
        assert_eq!(reader.entries_read(), 0);
        assert_eq!(reader.read_all().unwrap().len(), 5);
    }

    #[test]
    fn test_iterator() {
        let (_temp_dir, log_path) = setup_test_log();
        write_entries(&log_path, 4);

        let reader = LogReader::open(&log_path, 4).unwrap();
        let keys: Vec<_> = reader.map(|e| e.unwrap().key).collect();
        assert_eq!(keys.len(), 4);
        assert_eq!(keys[0], b"key0");
    }

    #[test]
    fn test_truncated_tail_is_error() {
        let (_temp_dir, log_path) = setup_test_log();
        write_entries(&log_path, 3);

        let len = std::fs::metadata(&log_path).unwrap().len();
        let file = std::fs::OpenOptions::new().write(true).open(&log_path).unwrap();
        file.set_len(len - 3).unwrap();

        let mut reader = LogReader::open(&log_path, 3).unwrap();
        assert!(reader.read_entry().unwrap().is_some());
        assert!(reader.read_entry().unwrap().is_some());
        let err = reader.read_entry().unwrap_err();
        assert!(err.is_truncation());

        // Iteration stops after the error
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_rejects_foreign_file() {
        let (_temp_dir, log_path) = setup_test_log();
        let mut file = std::fs::File::create(&log_path).unwrap();
        file.write_all(b"definitely not a statelog file").unwrap();

        let err = LogReader::open(&log_path, 0).err().expect("Expected header error");
        assert!(matches!(err, Error::Corruption(_)));
    }

    #[test]
    fn test_missing_file() {
        let (_temp_dir, log_path) = setup_test_log();
        assert!(matches!(LogReader::open(&log_path, 0), Err(Error::Io(_))));
    }
}
