// Position bookkeeping for appended records
//
// `EntryInfo` says where a record sits in the file. `CachedEntryInfo` is the
// handle returned by `LogWriter::append`; it pairs the position with the
// ring-window slot (layer, index) the record was assigned, which is what
// `LogWriter::update_state` validates against.

use crate::entry::STATE_OFFSET;

/// Location of an encoded record within the log file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
    /// Byte offset of the first byte of the record
    pub position: u64,
    /// Encoded length of the record in bytes
    pub length: u32,
}

impl EntryInfo {
    pub fn new(position: u64, length: usize) -> Self {
        Self {
            position,
            length: length as u32,
        }
    }

    /// Byte offset of the mutable state field
    pub fn state_offset(&self) -> u64 {
        self.position + STATE_OFFSET
    }

    /// Offset one past the last byte of the record
    pub fn end(&self) -> u64 {
        self.position + self.length as u64
    }
}

/// Slot a record occupies in the transaction log window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerInfo {
    /// Roll-over generation the record was written in
    pub layer: u32,
    /// Slot index within the layer
    pub index: usize,
}

/// Handle for a previously appended record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedEntryInfo {
    info: EntryInfo,
    layer_info: LayerInfo,
}

impl CachedEntryInfo {
    pub(crate) fn new(info: EntryInfo, layer_info: LayerInfo) -> Self {
        Self { info, layer_info }
    }

    /// Where the record was placed when it was appended
    ///
    /// A roll-over compaction may move a live record, after which this no
    /// longer matches the file. The writer resolves the current position
    /// from its window.
    pub fn initial_entry_info(&self) -> EntryInfo {
        self.info
    }

    pub fn layer_info(&self) -> LayerInfo {
        self.layer_info
    }

    pub fn layer(&self) -> u32 {
        self.layer_info.layer
    }

    pub fn index(&self) -> usize {
        self.layer_info.index
    }

    /// Offset of the state byte at append time, see `initial_entry_info`
    pub fn initial_state_offset(&self) -> u64 {
        self.info.state_offset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_info_offsets() {
        let info = EntryInfo::new(20, 33);
        assert_eq!(info.state_offset(), 20);
        assert_eq!(info.end(), 53);
    }

    #[test]
    fn test_cached_entry_info_accessors() {
        let handle = CachedEntryInfo::new(
            EntryInfo::new(128, 40),
            LayerInfo { layer: 3, index: 9 },
        );
        assert_eq!(handle.layer(), 3);
        assert_eq!(handle.index(), 9);
        assert_eq!(handle.initial_state_offset(), 128);
        assert_eq!(handle.initial_entry_info().length, 40);
    }
}
