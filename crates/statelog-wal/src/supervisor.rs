// Log supervisors - drive periodic flushing of a LogWriter
//
// A supervisor is started by `LogWriter::open` with a `FlushHandle` and
// stopped by `LogWriter::close`. The handle only holds a weak reference, so
// a supervisor never keeps a dropped writer alive.

use crate::writer::Shared;
use statelog_core::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handle a supervisor uses to flush its writer
#[derive(Clone)]
pub struct FlushHandle {
    target: Weak<Shared>,
}

impl FlushHandle {
    pub(crate) fn new(target: Weak<Shared>) -> Self {
        Self { target }
    }

    /// Flush the writer
    ///
    /// Returns `Ok(false)` once the writer has been closed or dropped.
    pub fn flush(&self) -> Result<bool> {
        match self.target.upgrade() {
            Some(shared) => shared.flush(),
            None => Ok(false),
        }
    }
}

/// Schedules flushes for a writer
pub trait LogSupervisor: Send {
    /// Begin supervising the writer behind `handle`
    fn start(&mut self, handle: FlushHandle) -> Result<()>;

    /// Stop supervising; no flush may be issued after this returns
    fn stop(&mut self) -> Result<()>;
}

/// Supervisor that never flushes on its own
///
/// Durability is left to explicit `LogWriter::flush` calls and `close`.
#[derive(Debug, Default)]
pub struct ManualLogSupervisor;

impl LogSupervisor for ManualLogSupervisor {
    fn start(&mut self, _handle: FlushHandle) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Flushes the writer every `interval` on a dedicated thread
pub struct DefaultLogSupervisor {
    interval: Duration,
    flushes: Arc<AtomicU64>,
    runtime: Option<SupervisorRuntime>,
}

struct SupervisorRuntime {
    stop_signal: Arc<(Mutex<bool>, Condvar)>,
    thread: JoinHandle<()>,
}

impl DefaultLogSupervisor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            flushes: Arc::new(AtomicU64::new(0)),
            runtime: None,
        }
    }

    pub fn from_millis(interval_ms: u64) -> Self {
        Self::new(Duration::from_millis(interval_ms))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.runtime.is_some()
    }

    /// Number of scheduled flushes that reached the writer
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Shared counter, readable after the supervisor is handed to a writer
    pub fn flush_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.flushes)
    }
}

impl LogSupervisor for DefaultLogSupervisor {
    fn start(&mut self, handle: FlushHandle) -> Result<()> {
        if self.runtime.is_some() {
            return Err(Error::InvalidOperation(
                "Log supervisor is already running".to_string(),
            ));
        }
        if self.interval.is_zero() {
            return Err(Error::InvalidOperation(
                "Flush interval must be greater than zero".to_string(),
            ));
        }

        let stop_signal = Arc::new((Mutex::new(false), Condvar::new()));
        let thread_signal = Arc::clone(&stop_signal);
        let flushes = Arc::clone(&self.flushes);
        let interval = self.interval;

        let thread = thread::Builder::new()
            .name("statelog-flush".into())
            .spawn(move || flush_loop(handle, interval, &thread_signal, &flushes))?;

        tracing::debug!(interval_ms = interval.as_millis() as u64, "log supervisor started");
        self.runtime = Some(SupervisorRuntime {
            stop_signal,
            thread,
        });
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let Some(runtime) = self.runtime.take() else {
            return Ok(());
        };

        {
            let (lock, cvar) = &*runtime.stop_signal;
            let mut stopped = lock.lock().map_err(|_| Error::LockPoisoned)?;
            *stopped = true;
            cvar.notify_all();
        }

        runtime
            .thread
            .join()
            .map_err(|_| Error::InvalidOperation("Log flush thread panicked".to_string()))?;
        tracing::debug!(flushes = self.flush_count(), "log supervisor stopped");
        Ok(())
    }
}

impl Drop for DefaultLogSupervisor {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn flush_loop(
    handle: FlushHandle,
    interval: Duration,
    stop_signal: &(Mutex<bool>, Condvar),
    flushes: &AtomicU64,
) {
    let (lock, cvar) = stop_signal;
    loop {
        let Ok(stopped) = lock.lock() else {
            return;
        };
        let Ok((stopped, _)) = cvar.wait_timeout_while(stopped, interval, |stopped| !*stopped)
        else {
            return;
        };
        if *stopped {
            return;
        }
        // Never hold the stop lock while flushing
        drop(stopped);

        match handle.flush() {
            Ok(true) => {
                flushes.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) => return,
            Err(e) => tracing::warn!(error = %e, "scheduled log flush failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_supervisor_is_inert() {
        let mut supervisor = ManualLogSupervisor;
        supervisor.start(FlushHandle::new(Weak::new())).unwrap();
        supervisor.stop().unwrap();
    }

    #[test]
    fn test_flush_handle_without_writer() {
        let handle = FlushHandle::new(Weak::new());
        assert!(!handle.flush().unwrap());
    }

    #[test]
    fn test_default_supervisor_exits_when_writer_gone() {
        let mut supervisor = DefaultLogSupervisor::from_millis(5);
        supervisor.start(FlushHandle::new(Weak::new())).unwrap();
        assert!(supervisor.is_running());

        thread::sleep(Duration::from_millis(30));
        supervisor.stop().unwrap();
        assert!(!supervisor.is_running());
        assert_eq!(supervisor.flush_count(), 0);
    }

    #[test]
    fn test_double_start_rejected() {
        let mut supervisor = DefaultLogSupervisor::from_millis(1000);
        supervisor.start(FlushHandle::new(Weak::new())).unwrap();
        assert!(supervisor.start(FlushHandle::new(Weak::new())).is_err());
        supervisor.stop().unwrap();
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut supervisor = DefaultLogSupervisor::new(Duration::ZERO);
        assert!(supervisor.start(FlushHandle::new(Weak::new())).is_err());
    }

    #[test]
    fn test_stop_is_prompt() {
        let mut supervisor = DefaultLogSupervisor::from_millis(60_000);
        supervisor.start(FlushHandle::new(Weak::new())).unwrap();

        let started = std::time::Instant::now();
        supervisor.stop().unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
