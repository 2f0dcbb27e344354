//! Error types for statelog.

use std::fmt;

/// The main error type for statelog operations.
#[derive(Debug)]
pub enum Error {
    /// A writer lock was poisoned by a panicking thread
    LockPoisoned,

    /// I/O error (disk full, permission denied, ...)
    Io(std::io::Error),

    /// The file is not a valid log: bad header, unknown version,
    /// checksum mismatch or an impossible field value
    Corruption(String),

    /// The last record of the file was cut short
    Truncated(String),

    /// The record was superseded by a roll-over and can no longer be updated
    Superseded {
        /// Layer the record was written in
        entry_layer: u32,
        /// Slot index of the record within its layer
        entry_index: usize,
        /// Layer of the most recent append
        current_layer: u32,
        /// Slot index of the most recent append
        current_index: usize,
    },

    /// Invalid operation (closed writer, bad configuration, ...)
    InvalidOperation(String),
}

impl Error {
    /// True for errors caused by malformed file contents.
    pub fn is_format_error(&self) -> bool {
        matches!(self, Error::Corruption(_) | Error::Truncated(_))
    }

    /// True when the error only means the record tail was cut short.
    pub fn is_truncation(&self) -> bool {
        matches!(self, Error::Truncated(_))
    }

    /// True when an update was refused because the record is no longer live.
    ///
    /// The record itself is intact; callers decide whether this is fatal.
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, Error::Superseded { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::LockPoisoned => write!(f, "Lock poisoned"),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Corruption(msg) => write!(f, "Log corruption: {}", msg),
            Error::Truncated(msg) => write!(f, "Truncated record: {}", msg),
            Error::Superseded {
                entry_layer,
                entry_index,
                current_layer,
                current_index,
            } => write!(
                f,
                "Record at layer {} index {} was superseded (log is at layer {} index {})",
                entry_layer, entry_index, current_layer, current_index
            ),
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// A specialized `Result` type for statelog operations.
pub type Result<T> = std::result::Result<T, Error>;
