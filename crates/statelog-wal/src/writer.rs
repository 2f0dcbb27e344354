// Log writer - appends entries, updates their state in place, rolls over
//
// Roll-over policy: the append that finds the current layer full starts a
// new layer *before* writing. That append compacts the file: the header and
// the live window (previous-layer survivors, then the new record) are
// written with each record's current state to a staging file, which then
// replaces the log. Later appends in the layer leave superseded copies
// behind; `close` compacts once more so a closed log holds exactly the live
// window, oldest record first.
//
// A failed append leaves neither the window nor the file changed.

use crate::entry::{EntryState, LogEntry};
use crate::entry_info::{CachedEntryInfo, EntryInfo};
use crate::header::Header;
use crate::sink::RandomAccessSink;
use crate::supervisor::{FlushHandle, LogSupervisor};
use crate::transaction_log::TransactionLog;
use crate::WalConfig;
use statelog_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// State shared between the writer and its supervisor
pub(crate) struct Shared {
    state: Mutex<WriterState>,
}

struct WriterState {
    /// `None` once the writer is closed
    sink: Option<RandomAccessSink>,
    log: TransactionLog,
    /// Superseded records still present in the file
    stale_records: usize,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, WriterState>> {
        self.state.lock().map_err(|_| Error::LockPoisoned)
    }

    /// Flush pending bytes; `Ok(false)` if the writer is closed
    pub(crate) fn flush(&self) -> Result<bool> {
        let mut state = self.lock()?;
        match state.sink.as_mut() {
            Some(sink) => {
                sink.flush()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Appends records to a single log file
///
/// All operations take `&self`; share the writer between threads with
/// `Arc<LogWriter>`. Each call is atomic with respect to the others.
pub struct LogWriter {
    shared: Arc<Shared>,
    supervisor: Mutex<Box<dyn LogSupervisor>>,
    path: PathBuf,
    max_record_count: usize,
}

impl LogWriter {
    /// Create the log file at `path` and start `supervisor`
    ///
    /// An existing file at `path` is replaced.
    pub fn open<S>(path: impl AsRef<Path>, supervisor: S, max_record_count: usize) -> Result<Self>
    where
        S: LogSupervisor + 'static,
    {
        let path = path.as_ref().to_path_buf();
        let log = TransactionLog::new(max_record_count)?;

        let mut sink = RandomAccessSink::create(&path)?;
        sink.append(&Header::current().encode())?;
        sink.flush()?;

        let shared = Arc::new(Shared {
            state: Mutex::new(WriterState {
                sink: Some(sink),
                log,
                stale_records: 0,
            }),
        });

        let mut supervisor: Box<dyn LogSupervisor> = Box::new(supervisor);
        supervisor.start(FlushHandle::new(Arc::downgrade(&shared)))?;

        tracing::debug!(path = %path.display(), max_record_count, "opened log writer");

        Ok(Self {
            shared,
            supervisor: Mutex::new(supervisor),
            path,
            max_record_count,
        })
    }

    /// Open a writer using a `DefaultLogSupervisor` with the configured interval
    pub fn from_config(config: &WalConfig) -> Result<Self> {
        config.validate()?;
        Self::open(
            &config.log_path,
            crate::DefaultLogSupervisor::from_millis(config.flush_interval_ms),
            config.max_record_count,
        )
    }

    /// Append an entry and return the handle for later state updates
    pub fn append(&self, entry: LogEntry) -> Result<CachedEntryInfo> {
        let frame = entry.encode()?;

        let mut guard = self.shared.lock()?;
        let WriterState {
            sink,
            log,
            stale_records,
        } = &mut *guard;
        let sink = sink.as_mut().ok_or_else(closed_error)?;

        let (layer_info, rolled_over, info) =
            log.add_with(entry, |log, layer_info, rolled_over| {
                if rolled_over {
                    let rewritten = rewrite_live(sink, log)?;
                    tracing::debug!(
                        layer = layer_info.layer,
                        records = rewritten,
                        "rolled over log to new layer"
                    );
                    log.entry_info(layer_info.index).ok_or_else(|| {
                        Error::InvalidOperation("Roll-over lost the new record".to_string())
                    })
                } else {
                    let position = sink.append(&frame)?;
                    let info = EntryInfo::new(position, frame.len());
                    log.set_entry_info(layer_info.index, info);
                    Ok(info)
                }
            })?;

        if rolled_over {
            *stale_records = 0;
        } else if layer_info.layer > 0 {
            *stale_records += 1;
        }

        tracing::trace!(
            layer = layer_info.layer,
            index = layer_info.index,
            position = info.position,
            "appended log entry"
        );
        Ok(CachedEntryInfo::new(info, layer_info))
    }

    /// Rewrite the state byte of a previously appended record
    ///
    /// Fails with `Error::Superseded` if a roll-over has reused the record's
    /// slot since it was appended.
    pub fn update_state(&self, handle: &CachedEntryInfo, new_state: EntryState) -> Result<()> {
        let mut guard = self.shared.lock()?;
        let state = &mut *guard;
        let sink = state.sink.as_mut().ok_or_else(closed_error)?;

        let previous = state.log.entry(handle.index()).map(|entry| entry.entry_state);
        let info = state.log.update_state(handle.layer_info(), new_state)?;
        if let Err(e) = sink.write_at(info.state_offset(), &[new_state as u8]) {
            // Keep the window in line with the file
            if let Some(previous) = previous {
                state.log.update_state(handle.layer_info(), previous)?;
            }
            return Err(e);
        }

        tracing::trace!(
            layer = handle.layer(),
            index = handle.index(),
            state = ?new_state,
            "updated log entry state"
        );
        Ok(())
    }

    /// Force pending bytes to stable storage
    pub fn flush(&self) -> Result<()> {
        if self.shared.flush()? {
            Ok(())
        } else {
            Err(closed_error())
        }
    }

    /// Stop the supervisor, compact, flush and release the file
    ///
    /// Calling `close` again is a no-op. The file handle is released even
    /// when the final compaction or flush fails.
    pub fn close(&self) -> Result<()> {
        let stop_result = self
            .supervisor
            .lock()
            .map_err(|_| Error::LockPoisoned)
            .and_then(|mut supervisor| supervisor.stop());

        let mut guard = self.shared.lock()?;
        let state = &mut *guard;
        let Some(mut sink) = state.sink.take() else {
            return stop_result;
        };

        if state.stale_records > 0 {
            let rewritten = rewrite_live(&mut sink, &mut state.log)?;
            tracing::debug!(records = rewritten, stale = state.stale_records, "compacted log on close");
            state.stale_records = 0;
        }
        sink.flush()?;
        drop(sink);

        tracing::info!(
            path = %self.path.display(),
            records = state.log.len(),
            layer = state.log.layer(),
            "closed log writer"
        );
        stop_result
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_record_count(&self) -> usize {
        self.max_record_count
    }

    /// Number of live (not superseded) records
    pub fn record_count(&self) -> usize {
        self.state().log.len()
    }

    /// Layer the most recent append went to
    pub fn current_layer(&self) -> u32 {
        self.state().log.layer()
    }

    pub fn is_closed(&self) -> bool {
        self.state().sink.is_none()
    }

    /// Read-only access for accessors; a poisoned lock still has usable state
    fn state(&self) -> MutexGuard<'_, WriterState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        // Best effort close on drop
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "failed to close log writer on drop");
        }
    }
}

fn closed_error() -> Error {
    Error::InvalidOperation("Log writer is closed".to_string())
}

/// Replace the file with the header and the live window, oldest first
///
/// Slot positions are only updated once the new file is in place.
fn rewrite_live(sink: &mut RandomAccessSink, log: &mut TransactionLog) -> Result<usize> {
    let indices: Vec<usize> = log.live_indices().collect();

    let mut frames = Vec::with_capacity(indices.len() + 1);
    frames.push(Header::current().encode().to_vec());
    for &index in &indices {
        let entry = log.entry(index).ok_or_else(|| {
            Error::InvalidOperation(format!("Live slot {} has no record", index))
        })?;
        frames.push(entry.encode()?);
    }

    let offsets = sink.replace(&frames)?;
    for (i, &index) in indices.iter().enumerate() {
        log.set_entry_info(index, EntryInfo::new(offsets[i + 1], frames[i + 1].len()));
    }

    Ok(indices.len())
}
