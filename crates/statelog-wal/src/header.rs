// Log file header - written once when the file is created
//
// Header format (binary):
// [format name: FORMAT_NAME_SIZE bytes, space padded] [file version: u32 LE]

use statelog_core::format_version::{self, FORMAT_NAME, FORMAT_NAME_SIZE, LOG_FORMAT_VERSION};
use statelog_core::{Error, Result};
use std::io::{Read, Write};

/// Fixed-layout header at the start of every log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Format name as stored on disk, including padding
    pub format_name: String,
    /// Version of the record layout that follows
    pub file_version: u32,
}

impl Header {
    /// Identifying name of the format
    pub const FORMAT_NAME: &'static str = FORMAT_NAME;
    /// Version written by this build
    pub const CURRENT_FILE_VERSION: u32 = LOG_FORMAT_VERSION;
    /// Size of the encoded header in bytes
    pub const BYTES: usize = FORMAT_NAME_SIZE + 4;

    /// Header for a file written by this build
    pub fn current() -> Self {
        Self {
            format_name: format!("{:<width$}", FORMAT_NAME, width = FORMAT_NAME_SIZE),
            file_version: Self::CURRENT_FILE_VERSION,
        }
    }

    /// Format name without padding
    pub fn trimmed_name(&self) -> &str {
        self.format_name.trim()
    }

    /// Encode to the fixed-width on-disk layout
    pub fn encode(&self) -> [u8; Self::BYTES] {
        let mut buf = [b' '; Self::BYTES];
        let name = self.format_name.as_bytes();
        let len = name.len().min(FORMAT_NAME_SIZE);
        buf[..len].copy_from_slice(&name[..len]);
        buf[FORMAT_NAME_SIZE..].copy_from_slice(&self.file_version.to_le_bytes());
        buf
    }

    /// Decode and validate a header
    ///
    /// Fails with `Error::Corruption` if the name or version is not one this
    /// build understands.
    pub fn decode(data: &[u8; Self::BYTES]) -> Result<Self> {
        let format_name = std::str::from_utf8(&data[..FORMAT_NAME_SIZE])
            .map_err(|_| Error::Corruption("Header format name is not valid UTF-8".to_string()))?
            .to_string();

        let mut version_bytes = [0u8; 4];
        version_bytes.copy_from_slice(&data[FORMAT_NAME_SIZE..]);
        let header = Self {
            format_name,
            file_version: u32::from_le_bytes(version_bytes),
        };

        header.validate()?;
        Ok(header)
    }

    fn validate(&self) -> Result<()> {
        if self.trimmed_name() != Self::FORMAT_NAME {
            return Err(Error::Corruption(format!(
                "Unknown log format '{}', expected '{}'",
                self.trimmed_name(),
                Self::FORMAT_NAME
            )));
        }

        if !format_version::log_version().can_read(self.file_version) {
            return Err(Error::Corruption(format!(
                "Unsupported log file version {} (this build reads version {})",
                self.file_version,
                Self::CURRENT_FILE_VERSION
            )));
        }

        Ok(())
    }

    /// Write the header at the current position of `out`
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(&self.encode())?;
        Ok(())
    }

    /// Read and validate a header from the current position of `input`
    pub fn read_from<R: Read>(input: &mut R) -> Result<Self> {
        let mut buf = [0u8; Self::BYTES];
        input.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::Corruption("File is too short to contain a log header".to_string())
            } else {
                Error::Io(e)
            }
        })?;
        Self::decode(&buf)
    }
}
