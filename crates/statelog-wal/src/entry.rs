// Log entry format and encoding/decoding
//
// Record format (binary, integers LE):
// [state: u8] [key metadata: u32] [value metadata: u32]
// [key length: u32] [key bytes] [value length: u32] [value bytes] [crc32: u32]
//
// The CRC covers everything after the state byte, so the state can be
// rewritten in place without touching the checksum.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use statelog_core::{Error, Result};
use std::io::{ErrorKind, Read};

/// Largest key or value accepted by the decoder
pub const MAX_FIELD_LEN: usize = 16 * 1024 * 1024;

/// Offset of the state byte within an encoded record
pub const STATE_OFFSET: u64 = 0;

/// Bytes of framing around key and value
pub const FRAME_OVERHEAD: usize = 1 + 4 + 4 + 4 + 4 + 4;

/// Lifecycle stage of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EntryState {
    New = 0,
    Processed = 1,
    Failed = 2,
}

impl TryFrom<u8> for EntryState {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(EntryState::New),
            1 => Ok(EntryState::Processed),
            2 => Ok(EntryState::Failed),
            _ => Err(Error::Corruption(format!("Unknown entry state: {}", value))),
        }
    }
}

/// A record to append to the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub entry_state: EntryState,
    pub key_metadata: u32,
    pub key: Vec<u8>,
    pub value_metadata: u32,
    pub value: Vec<u8>,
}

impl LogEntry {
    pub fn new(
        entry_state: EntryState,
        key_metadata: u32,
        key: Vec<u8>,
        value_metadata: u32,
        value: Vec<u8>,
    ) -> Self {
        Self {
            entry_state,
            key_metadata,
            key,
            value_metadata,
            value,
        }
    }

    /// Create a `New` entry with zero metadata tags
    pub fn fresh(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self::new(EntryState::New, 0, key, 0, value)
    }

    /// Size of the encoded record in bytes
    pub fn encoded_len(&self) -> usize {
        FRAME_OVERHEAD + self.key.len() + self.value.len()
    }

    /// Encode the record with framing and CRC
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.key.len() > MAX_FIELD_LEN || self.value.len() > MAX_FIELD_LEN {
            return Err(Error::InvalidOperation(format!(
                "Entry too large: key {} bytes, value {} bytes (limit {})",
                self.key.len(),
                self.value.len(),
                MAX_FIELD_LEN
            )));
        }

        let mut frame = Vec::with_capacity(self.encoded_len());
        frame.push(self.entry_state as u8);
        frame.extend_from_slice(&self.key_metadata.to_le_bytes());
        frame.extend_from_slice(&self.value_metadata.to_le_bytes());
        frame.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        frame.extend_from_slice(&self.key);
        frame.extend_from_slice(&(self.value.len() as u32).to_le_bytes());
        frame.extend_from_slice(&self.value);

        let mut hasher = Hasher::new();
        hasher.update(&frame[1..]);
        frame.extend_from_slice(&hasher.finalize().to_le_bytes());

        Ok(frame)
    }
}

/// A record as read back from a log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedLogEntry {
    pub entry_state: EntryState,
    pub key_metadata: u32,
    pub key: Vec<u8>,
    pub value_metadata: u32,
    pub value: Vec<u8>,
}

impl PersistedLogEntry {
    /// Decode one record from the start of `data`
    ///
    /// Returns the record and the number of bytes consumed. An incomplete
    /// record is reported as `Error::Truncated`.
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let mut input = data;
        match Self::read_from(&mut input)? {
            Some(decoded) => Ok(decoded),
            None => Err(Error::Truncated("Empty record frame".to_string())),
        }
    }

    /// Read one record from a stream
    ///
    /// Returns `Ok(None)` when the stream ends exactly at a record boundary.
    pub fn read_from<R: Read>(input: &mut R) -> Result<Option<(Self, usize)>> {
        let mut state = [0u8; 1];
        loop {
            match input.read(&mut state) {
                Ok(0) => return Ok(None),
                Ok(_) => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }

        let mut hasher = Hasher::new();

        let mut fixed = [0u8; 12];
        read_field(input, &mut fixed, "key length")?;
        hasher.update(&fixed);
        let key_metadata = u32::from_le_bytes([fixed[0], fixed[1], fixed[2], fixed[3]]);
        let value_metadata = u32::from_le_bytes([fixed[4], fixed[5], fixed[6], fixed[7]]);
        let key_len = checked_len(u32::from_le_bytes([fixed[8], fixed[9], fixed[10], fixed[11]]))?;

        let mut key = vec![0u8; key_len];
        read_field(input, &mut key, "key")?;
        hasher.update(&key);

        let mut len_buf = [0u8; 4];
        read_field(input, &mut len_buf, "value length")?;
        hasher.update(&len_buf);
        let value_len = checked_len(u32::from_le_bytes(len_buf))?;

        let mut value = vec![0u8; value_len];
        read_field(input, &mut value, "value")?;
        hasher.update(&value);

        let mut crc_buf = [0u8; 4];
        read_field(input, &mut crc_buf, "checksum")?;
        let expected_crc = u32::from_le_bytes(crc_buf);
        let actual_crc = hasher.finalize();
        if actual_crc != expected_crc {
            return Err(Error::Corruption(format!(
                "CRC mismatch: expected {}, got {}",
                expected_crc, actual_crc
            )));
        }

        let entry_state = EntryState::try_from(state[0])?;
        let consumed = FRAME_OVERHEAD + key_len + value_len;

        Ok(Some((
            PersistedLogEntry {
                entry_state,
                key_metadata,
                key,
                value_metadata,
                value,
            },
            consumed,
        )))
    }
}

impl From<PersistedLogEntry> for LogEntry {
    fn from(entry: PersistedLogEntry) -> Self {
        LogEntry::new(
            entry.entry_state,
            entry.key_metadata,
            entry.key,
            entry.value_metadata,
            entry.value,
        )
    }
}

fn read_field<R: Read>(input: &mut R, buf: &mut [u8], field: &str) -> Result<()> {
    input.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            Error::Truncated(format!("Record ends inside its {}", field))
        } else {
            Error::Io(e)
        }
    })
}

fn checked_len(len: u32) -> Result<usize> {
    let len = len as usize;
    if len > MAX_FIELD_LEN {
        return Err(Error::Corruption(format!(
            "Field length too large: {} bytes",
            len
        )));
    }
    Ok(len)
}
