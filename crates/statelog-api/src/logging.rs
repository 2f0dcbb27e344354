//! Logging configuration for statelog
//!
//! The engine crates only emit `tracing` events. Applications that do not
//! install their own subscriber can use `LogConfig` to get level filtering,
//! pretty or compact output, and daily-rotated log files.

use std::path::{Path, PathBuf};

use statelog_core::{Error, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default file name when a log path has no file component
const DEFAULT_LOG_FILE: &str = "statelog.log";

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    /// Daily-rotated files with the given path as prefix
    File(PathBuf),
    Both(PathBuf),
}

/// Log format style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human oriented
    Pretty,
    /// One line per event
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive, e.g. `info` or `statelog_wal=debug`
    pub level: String,
    pub output: LogOutput,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: LogOutput::Stdout,
            format: LogFormat::Compact,
        }
    }
}

impl LogConfig {
    pub fn info() -> Self {
        Self::default()
    }

    pub fn debug() -> Self {
        Self::default().with_level("debug")
    }

    /// Per-record events from the writer (`trace` level)
    pub fn trace() -> Self {
        Self::default().with_level("trace")
    }

    pub fn with_level<S: Into<String>>(mut self, level: S) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::File(path.into());
        self
    }

    pub fn with_both<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::Both(path.into());
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Build the filter; `RUST_LOG` takes precedence over `level`
    fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .map_err(|e| Error::InvalidOperation(format!("Invalid log level '{}': {}", self.level, e)))
    }

    /// Install this configuration as the global subscriber
    ///
    /// For file output the returned guard must be kept alive; dropping it
    /// stops the background writer and flushes what is left.
    ///
    /// ```rust,no_run
    /// use statelog::logging::LogConfig;
    ///
    /// let _guard = LogConfig::debug().with_file("/var/log/app/statelog.log").init()?;
    /// # Ok::<(), statelog::Error>(())
    /// ```
    pub fn init(self) -> Result<Option<WorkerGuard>> {
        let filter = self.env_filter()?;

        match &self.output {
            LogOutput::Stdout => {
                install(filter, self.format, true, std::io::stdout)?;
                Ok(None)
            }
            LogOutput::File(path) => {
                let (writer, guard) = tracing_appender::non_blocking(daily_appender(path));
                install(filter, self.format, false, writer)?;
                Ok(Some(guard))
            }
            LogOutput::Both(path) => {
                let (writer, guard) = tracing_appender::non_blocking(daily_appender(path));
                install(filter, self.format, false, std::io::stdout.and(writer))?;
                Ok(Some(guard))
            }
        }
    }
}

fn daily_appender(path: &Path) -> tracing_appender::rolling::RollingFileAppender {
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let prefix = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE);
    tracing_appender::rolling::daily(directory, prefix)
}

fn install<W>(filter: EnvFilter, format: LogFormat, ansi: bool, writer: W) -> Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry().with(filter);
    let layer = fmt::layer().with_ansi(ansi).with_writer(writer);

    let installed = match format {
        LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
        LogFormat::Compact => registry.with(layer.compact()).try_init(),
    };
    installed.map_err(|e| Error::InvalidOperation(format!("Failed to install log subscriber: {}", e)))
}
