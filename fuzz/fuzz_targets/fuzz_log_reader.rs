#![no_main]

use libfuzzer_sys::fuzz_target;
use statelog_wal::{Header, LogReader, LogRecovery};
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1_000_000 {
        return;
    }

    let Ok(mut file) = tempfile::NamedTempFile::new() else {
        return;
    };

    // Half the inputs get a valid header so the record parser is reached
    let mut contents = Vec::with_capacity(Header::BYTES + data.len());
    if data.first().is_some_and(|b| b & 1 == 0) {
        contents.extend_from_slice(&Header::current().encode());
    }
    contents.extend_from_slice(data);
    if file.write_all(&contents).is_err() {
        return;
    }

    if let Ok(mut reader) = LogReader::open(file.path(), 10_000) {
        let _ = reader.read_all();
    }
    let _ = LogRecovery::verify(file.path());
});
