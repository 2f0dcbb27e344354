//! File format constants for statelog logs.
//!
//! Every log file starts with a fixed-width header carrying the format
//! name and a version number. Readers refuse any version they cannot read.

/// Identifying name stored at the start of every log file
pub const FORMAT_NAME: &str = "statelog";

/// Width of the (space padded) format name field in bytes
pub const FORMAT_NAME_SIZE: usize = 16;

/// Log file format version
pub const LOG_FORMAT_VERSION: u32 = 1;

/// Version compatibility information
pub struct FormatVersion {
    /// Current version of this format
    pub current: u32,
    /// Minimum supported version for reading
    pub min_read: u32,
}

impl FormatVersion {
    /// Check if a version can be read
    pub fn can_read(&self, version: u32) -> bool {
        version >= self.min_read && version <= self.current
    }
}

/// Log format version info
pub fn log_version() -> FormatVersion {
    FormatVersion {
        current: LOG_FORMAT_VERSION,
        min_read: LOG_FORMAT_VERSION,
    }
}
