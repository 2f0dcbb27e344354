use statelog::logging::LogConfig;
use statelog::{EntryState, LogEntry, LogRecovery, WalConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = LogConfig::debug().init()?;

    println!("=== statelog Acknowledgement Demo ===\n");

    let dir = std::env::temp_dir().join("statelog_ack_demo");
    std::fs::create_dir_all(&dir)?;
    let config = WalConfig::new(dir.join("acks.wal"))
        .with_max_record_count(5)
        .with_flush_interval_ms(100);

    let writer = statelog::open_writer(&config)?;

    println!("1. Appending 8 messages (window of 5)...");
    let mut handles = Vec::new();
    for i in 0..8 {
        let key = format!("order-{}", i);
        handles.push(writer.append(LogEntry::fresh(key.into_bytes(), b"{}".to_vec()))?);
    }

    println!("2. Acknowledging all messages...");
    for (i, handle) in handles.iter().enumerate() {
        match writer.update_state(handle, EntryState::Processed) {
            Ok(()) => println!("   order-{} processed", i),
            Err(e) if e.is_policy_violation() => println!("   order-{} already rolled over", i),
            Err(e) => return Err(e.into()),
        }
    }
    writer.close()?;

    println!("3. Replaying the log...");
    let (entries, stats) = LogRecovery::recover(&config.log_path)?;
    for entry in &entries {
        println!(
            "   {} -> {:?}",
            String::from_utf8_lossy(&entry.key),
            entry.entry_state
        );
    }
    println!("\n{:?}", stats);

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
