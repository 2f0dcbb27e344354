// Transaction log - ring window over the most recent records
//
// The window has room for `capacity` records. Records are assigned slots in
// order; when the window is full the next append starts a new layer at slot
// 0, superseding the oldest record of the previous layer. A record stays
// updatable until its slot is reused, see `can_update`.

use crate::entry::{EntryState, LogEntry};
use crate::entry_info::{EntryInfo, LayerInfo};
use statelog_core::{Error, Result};

/// Decide whether the record in slot `(entry_layer, entry_index)` is still live
/// when the most recent append went to `(current_layer, current_index)`.
///
/// Records of the current layer are live up to the current slot. Records of
/// the previous layer are live only in slots the current layer has not
/// reached yet. Anything older has been overwritten.
pub fn can_update(
    current_layer: u32,
    current_index: usize,
    entry_layer: u32,
    entry_index: usize,
) -> bool {
    if entry_layer == current_layer {
        return entry_index <= current_index;
    }

    entry_layer.checked_add(1) == Some(current_layer) && entry_index > current_index
}

#[derive(Debug)]
struct Slot {
    layer_info: LayerInfo,
    info: EntryInfo,
    entry: LogEntry,
}

/// In-memory window of the live records of a log
#[derive(Debug)]
pub struct TransactionLog {
    slots: Vec<Slot>,
    capacity: usize,
    layer: u32,
    next_index: usize,
}

impl TransactionLog {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidOperation(
                "Transaction log capacity must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            slots: Vec::new(),
            capacity,
            layer: 0,
            next_index: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Layer of the next append (or of the most recent one)
    pub fn layer(&self) -> u32 {
        self.layer
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        if self.layer == 0 {
            self.next_index
        } else {
            self.capacity
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the next `add` starts a new layer
    pub fn is_full(&self) -> bool {
        self.next_index == self.capacity
    }

    /// Slot of the most recent append
    pub fn current(&self) -> Option<LayerInfo> {
        if self.next_index == 0 {
            return None;
        }
        Some(LayerInfo {
            layer: self.layer,
            index: self.next_index - 1,
        })
    }

    /// Assign the next slot to `entry`
    ///
    /// Returns the slot and whether a roll-over to a new layer happened.
    /// The slot's position is unknown until `set_entry_info` is called.
    pub fn add(&mut self, entry: LogEntry) -> Result<(LayerInfo, bool)> {
        self.add_with(entry, |_, _, _| Ok(()))
            .map(|(layer_info, rolled_over, ())| (layer_info, rolled_over))
    }

    /// Assign the next slot to `entry`, then run `persist` on the updated log
    ///
    /// If `persist` fails the log is restored to its state before the call:
    /// the displaced slot comes back and the layer and index counters are
    /// rewound. `persist` must not change other slots before it can fail.
    pub fn add_with<T, F>(&mut self, entry: LogEntry, persist: F) -> Result<(LayerInfo, bool, T)>
    where
        F: FnOnce(&mut Self, LayerInfo, bool) -> Result<T>,
    {
        let (layer_info, rolled_over) = self.next_slot()?;
        let (prev_layer, prev_next_index) = (self.layer, self.next_index);

        let slot = Slot {
            layer_info,
            info: EntryInfo::new(0, entry.encoded_len()),
            entry,
        };
        let displaced = if layer_info.index < self.slots.len() {
            Some(std::mem::replace(&mut self.slots[layer_info.index], slot))
        } else {
            self.slots.push(slot);
            None
        };
        self.layer = layer_info.layer;
        self.next_index = layer_info.index + 1;

        match persist(self, layer_info, rolled_over) {
            Ok(value) => Ok((layer_info, rolled_over, value)),
            Err(e) => {
                match displaced {
                    Some(slot) => self.slots[layer_info.index] = slot,
                    None => {
                        self.slots.pop();
                    }
                }
                self.layer = prev_layer;
                self.next_index = prev_next_index;
                Err(e)
            }
        }
    }

    /// Slot the next `add` goes to, and whether it starts a new layer
    fn next_slot(&self) -> Result<(LayerInfo, bool)> {
        if !self.is_full() {
            let layer_info = LayerInfo {
                layer: self.layer,
                index: self.next_index,
            };
            return Ok((layer_info, false));
        }

        let layer = self.layer.checked_add(1).ok_or_else(|| {
            Error::InvalidOperation("Transaction log layer counter exhausted".to_string())
        })?;
        Ok((LayerInfo { layer, index: 0 }, true))
    }

    pub fn set_entry_info(&mut self, index: usize, info: EntryInfo) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.info = info;
        }
    }

    pub fn entry_info(&self, index: usize) -> Option<EntryInfo> {
        self.slots.get(index).map(|slot| slot.info)
    }

    pub fn entry(&self, index: usize) -> Option<&LogEntry> {
        self.slots.get(index).map(|slot| &slot.entry)
    }

    /// Whether the record in `layer_info` has not been superseded
    pub fn can_update(&self, layer_info: LayerInfo) -> bool {
        match self.current() {
            Some(current) => can_update(
                current.layer,
                current.index,
                layer_info.layer,
                layer_info.index,
            ),
            None => false,
        }
    }

    /// Record a new state for a live record and return its current position
    pub fn update_state(&mut self, layer_info: LayerInfo, state: EntryState) -> Result<EntryInfo> {
        let current = self.current().ok_or_else(|| {
            Error::InvalidOperation("Cannot update a record in an empty log".to_string())
        })?;

        if !self.can_update(layer_info) {
            return Err(Error::Superseded {
                entry_layer: layer_info.layer,
                entry_index: layer_info.index,
                current_layer: current.layer,
                current_index: current.index,
            });
        }

        match self.slots.get_mut(layer_info.index) {
            Some(slot) if slot.layer_info == layer_info => {
                slot.entry.entry_state = state;
                Ok(slot.info)
            }
            _ => Err(Error::InvalidOperation(format!(
                "No record at layer {} index {} in this log",
                layer_info.layer, layer_info.index
            ))),
        }
    }

    /// Slot indices of the live records, oldest first
    pub fn live_indices(&self) -> impl Iterator<Item = usize> {
        let (older, newer) = if self.layer == 0 {
            (0..0, 0..self.next_index)
        } else {
            (self.next_index..self.capacity, 0..self.next_index)
        };
        older.chain(newer)
    }
}
