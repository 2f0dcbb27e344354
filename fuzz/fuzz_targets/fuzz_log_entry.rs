#![no_main]

use libfuzzer_sys::fuzz_target;
use statelog_wal::{LogEntry, PersistedLogEntry};

fuzz_target!(|data: &[u8]| {
    // Limit input size to prevent timeout
    if data.len() > 1_000_000 {
        return;
    }

    // Decoding arbitrary bytes must fail cleanly, never panic
    if let Ok((entry, consumed)) = PersistedLogEntry::decode(data) {
        assert!(consumed <= data.len());
        assert_eq!(consumed, LogEntry::from(entry).encoded_len());
    }
});
