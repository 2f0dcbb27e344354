// Integration tests for writing, reading and updating a log

mod common;

use common::{numbered_entry, LogTestFixture};
use statelog_wal::{
    DefaultLogSupervisor, EntryState, Header, LogEntry, LogReader, LogWriter, ManualLogSupervisor,
};
use std::sync::atomic::Ordering;
use std::time::Duration;

#[test]
fn test_round_trip_preserves_order_and_fields() {
    let fixture = LogTestFixture::new();

    let entries: Vec<LogEntry> = (0..50)
        .map(|i| {
            let state = if i % 3 == 0 {
                EntryState::Failed
            } else {
                EntryState::New
            };
            LogEntry::new(
                state,
                i as u32,
                format!("id-{}", i).into_bytes(),
                (i * 7) as u32,
                vec![i as u8; i],
            )
        })
        .collect();

    {
        let writer = LogWriter::open(fixture.log_path(), ManualLogSupervisor, 1000)
            .expect("Failed to create writer");
        for entry in &entries {
            writer.append(entry.clone()).expect("Failed to append");
        }
        writer.close().expect("Failed to close");
    }

    let read_back: Vec<LogEntry> = fixture.read_all().into_iter().map(LogEntry::from).collect();
    assert_eq!(read_back, entries);
}

#[test]
fn test_header_integrity() {
    let fixture = LogTestFixture::new();

    let writer = LogWriter::open(fixture.log_path(), ManualLogSupervisor, 10).unwrap();
    writer.append(numbered_entry(0)).unwrap();
    writer.close().unwrap();

    let reader = LogReader::open(fixture.log_path(), 1).unwrap();
    assert_eq!(reader.header().format_name.trim(), Header::FORMAT_NAME);
    assert_eq!(reader.header().file_version, Header::CURRENT_FILE_VERSION);
}

#[test]
fn test_state_update_after_commit() {
    let fixture = LogTestFixture::new();
    let count = 200;

    let writer = LogWriter::open(fixture.log_path(), ManualLogSupervisor, 1000).unwrap();
    let handles: Vec<_> = (0..count)
        .map(|i| writer.append(numbered_entry(i)).unwrap())
        .collect();
    for handle in &handles {
        writer.update_state(handle, EntryState::Processed).unwrap();
    }
    writer.close().unwrap();

    let entries = fixture.read_all();
    assert_eq!(entries.len(), count);
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.entry_state, EntryState::Processed);
        assert_eq!(entry.key, format!("key{}", i).into_bytes());
        assert_eq!(entry.value, format!("value{}", i).into_bytes());
    }
}

#[test]
fn test_update_of_flushed_and_pending_records() {
    let fixture = LogTestFixture::new();

    let writer = LogWriter::open(fixture.log_path(), ManualLogSupervisor, 100).unwrap();
    let flushed = writer.append(numbered_entry(0)).unwrap();
    writer.flush().unwrap();
    let pending = writer.append(numbered_entry(1)).unwrap();

    writer.update_state(&flushed, EntryState::Processed).unwrap();
    writer.update_state(&pending, EntryState::Failed).unwrap();
    writer.close().unwrap();

    let states: Vec<_> = fixture.read_all().iter().map(|e| e.entry_state).collect();
    assert_eq!(states, vec![EntryState::Processed, EntryState::Failed]);
}

#[test]
fn test_background_supervisor_flushes() {
    let fixture = LogTestFixture::new();

    let supervisor = DefaultLogSupervisor::from_millis(10);
    let flushes = supervisor.flush_counter();

    let writer = LogWriter::open(fixture.log_path(), supervisor, 100).unwrap();
    writer.append(numbered_entry(0)).unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while flushes.load(Ordering::Relaxed) == 0 && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(flushes.load(Ordering::Relaxed) > 0);

    // The record is on disk without any explicit flush
    assert_eq!(fixture.read_all().len(), 1);

    writer.close().unwrap();
    let after_close = flushes.load(Ordering::Relaxed);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(flushes.load(Ordering::Relaxed), after_close);
}

#[test]
fn test_supervisor_never_flushes_faster_than_interval() {
    let fixture = LogTestFixture::new();

    let interval_ms = 50;
    let supervisor = DefaultLogSupervisor::from_millis(interval_ms);
    let flushes = supervisor.flush_counter();

    let started = std::time::Instant::now();
    let writer = LogWriter::open(fixture.log_path(), supervisor, 100).unwrap();
    for i in 0..10 {
        writer.append(numbered_entry(i)).unwrap();
        std::thread::sleep(Duration::from_millis(10));
    }
    std::thread::sleep(Duration::from_millis(20));

    let count = flushes.load(Ordering::Relaxed);
    let elapsed_ms = started.elapsed().as_millis() as u64;
    assert!(
        count <= elapsed_ms / interval_ms,
        "{} flushes in {} ms with a {} ms interval",
        count,
        elapsed_ms,
        interval_ms
    );

    writer.close().unwrap();
}

#[test]
fn test_manual_flush_races_with_supervisor() {
    let fixture = LogTestFixture::new();

    let writer = LogWriter::open(fixture.log_path(), DefaultLogSupervisor::from_millis(1), 10_000)
        .unwrap();
    for i in 0..500 {
        writer.append(numbered_entry(i)).unwrap();
        if i % 50 == 0 {
            writer.flush().unwrap();
        }
    }
    writer.close().unwrap();

    assert_eq!(fixture.read_all().len(), 500);
}

#[test]
fn test_large_values() {
    let fixture = LogTestFixture::new();

    let writer = LogWriter::open(fixture.log_path(), ManualLogSupervisor, 10).unwrap();
    let large_value = vec![0x5A; 1024 * 1024];
    writer
        .append(LogEntry::fresh(b"large_key".to_vec(), large_value.clone()))
        .unwrap();
    writer.append(numbered_entry(1)).unwrap();
    writer.close().unwrap();

    let entries = fixture.read_all();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].value, large_value);
}
