#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use statelog_wal::{EntryState, LogEntry, LogRecovery, LogWriter, ManualLogSupervisor};

#[derive(Arbitrary, Debug)]
enum Op {
    Append { key: Vec<u8>, value: Vec<u8> },
    Update { handle: u16, state: u8 },
    Flush,
}

#[derive(Arbitrary, Debug)]
struct Input {
    max_record_count: u8,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    if input.ops.len() > 512 {
        return;
    }
    let max_record_count = usize::from(input.max_record_count).max(1);

    let Ok(dir) = tempfile::TempDir::new() else {
        return;
    };
    let path = dir.path().join("fuzz.wal");
    let Ok(writer) = LogWriter::open(&path, ManualLogSupervisor, max_record_count) else {
        return;
    };

    let mut handles = Vec::new();
    let mut appended = 0usize;
    for op in input.ops {
        match op {
            Op::Append { key, value } => {
                if let Ok(handle) = writer.append(LogEntry::fresh(key, value)) {
                    handles.push(handle);
                    appended += 1;
                }
            }
            Op::Update { handle, state } => {
                let (Some(handle), Ok(state)) = (
                    handles.get(usize::from(handle) % handles.len().max(1)),
                    EntryState::try_from(state % 3),
                ) else {
                    continue;
                };
                if let Err(e) = writer.update_state(handle, state) {
                    assert!(e.is_policy_violation(), "unexpected error: {}", e);
                }
            }
            Op::Flush => {
                let _ = writer.flush();
            }
        }
        assert!(writer.record_count() <= max_record_count);
    }

    if writer.close().is_ok() {
        let stats = LogRecovery::verify(&path).expect("closed log must replay");
        assert_eq!(stats.total_entries as usize, appended.min(max_record_count));
    }
});
