//! Logging facade
//!
//! A `LogHandle` owns a `tracing` dispatcher bound to one sink (a log file in a
//! directory, or stderr) and one minimum severity. Entry points build a handle
//! and pass it by reference; `LogHandle::null()` is the explicit no-op logger.
//!
//! For call sites that cannot receive a handle, the free functions
//! (`configure`, `debug`, `info`, `warning`, `error`) operate on a process-wide
//! handle. The first successful `configure` wins; later calls are no-ops, and
//! logging before `configure` is silently dropped.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, OnceLock};
use thiserror::Error;
use tracing::Dispatch;
use tracing::level_filters::LevelFilter;

/// Default directory for file logging
pub const DEFAULT_LOG_DIR: &str = ".ml_monitor";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log level: {0}. Must be 'debug', 'info', 'warning' or 'error'")]
    InvalidSeverity(String),

    #[error("Failed to open log file {path}: {source}")]
    Sink {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("A global tracing subscriber is already installed")]
    GlobalAlreadySet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl FromStr for Severity {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            _ => Err(LoggingError::InvalidSeverity(s.to_string())),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

impl From<Severity> for LevelFilter {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Debug => LevelFilter::DEBUG,
            Severity::Info => LevelFilter::INFO,
            Severity::Warning => LevelFilter::WARN,
            Severity::Error => LevelFilter::ERROR,
        }
    }
}

/// Where log lines go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    Stderr,
    /// One `<program>.log` file inside this directory, appended to.
    Directory(PathBuf),
}

impl LogSink {
    /// `None` selects stderr.
    pub fn from_dir(dir: Option<PathBuf>) -> Self {
        match dir {
            Some(dir) => LogSink::Directory(dir),
            None => LogSink::Stderr,
        }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        LogSink::Directory(PathBuf::from(DEFAULT_LOG_DIR))
    }
}

pub struct LogHandle {
    severity: Severity,
    sink: LogSink,
    log_file: Option<PathBuf>,
    dispatch: Option<Dispatch>,
}

impl LogHandle {
    /// Builds a handle writing at `severity` and above to `sink`.
    ///
    /// For a directory sink the directory is created and the log file opened
    /// in append mode immediately, so I/O errors surface here.
    pub fn new(severity: Severity, sink: LogSink) -> Result<Self, LoggingError> {
        let builder = tracing_subscriber::fmt()
            .with_max_level(LevelFilter::from(severity))
            .with_target(false)
            .with_ansi(false);

        let (dispatch, log_file) = match &sink {
            LogSink::Stderr => (
                Dispatch::new(builder.with_writer(std::io::stderr).finish()),
                None,
            ),
            LogSink::Directory(dir) => {
                let path = log_file_path(dir);
                let file = open_log_file(dir, &path)?;
                (
                    Dispatch::new(builder.with_writer(Mutex::new(file)).finish()),
                    Some(path),
                )
            }
        };

        Ok(Self {
            severity,
            sink,
            log_file,
            dispatch: Some(dispatch),
        })
    }

    /// A handle that discards everything.
    pub fn null() -> Self {
        Self {
            severity: Severity::Error,
            sink: LogSink::Stderr,
            log_file: None,
            dispatch: None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.dispatch.is_none()
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    /// Path of the log file for directory sinks.
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Makes this handle's sink the process-wide `tracing` subscriber, so
    /// `tracing` macros anywhere in the crate reach the same destination.
    pub fn install_global(&self) -> Result<(), LoggingError> {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::set_global_default(dispatch.clone())
                .map_err(|_| LoggingError::GlobalAlreadySet),
            None => Ok(()),
        }
    }

    pub fn debug(&self, msg: &str) {
        if let Some(dispatch) = &self.dispatch {
            tracing::dispatcher::with_default(dispatch, || tracing::debug!("{}", msg));
        }
    }

    pub fn info(&self, msg: &str) {
        if let Some(dispatch) = &self.dispatch {
            tracing::dispatcher::with_default(dispatch, || tracing::info!("{}", msg));
        }
    }

    pub fn warning(&self, msg: &str) {
        if let Some(dispatch) = &self.dispatch {
            tracing::dispatcher::with_default(dispatch, || tracing::warn!("{}", msg));
        }
    }

    pub fn error(&self, msg: &str) {
        if let Some(dispatch) = &self.dispatch {
            tracing::dispatcher::with_default(dispatch, || tracing::error!("{}", msg));
        }
    }
}

impl fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogHandle")
            .field("severity", &self.severity)
            .field("sink", &self.sink)
            .field("null", &self.is_null())
            .finish()
    }
}

fn log_file_path(dir: &Path) -> PathBuf {
    let program = std::env::current_exe()
        .ok()
        .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "ml_monitor".to_string());
    dir.join(format!("{}.log", program))
}

fn open_log_file(dir: &Path, path: &Path) -> Result<File, LoggingError> {
    let sink_error = |source| LoggingError::Sink {
        path: path.display().to_string(),
        source,
    };
    fs::create_dir_all(dir).map_err(sink_error)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(sink_error)
}

static GLOBAL: OnceLock<LogHandle> = OnceLock::new();

/// Configures the process-wide handle.
///
/// Does nothing if a handle already exists, including validating `level`.
pub fn configure(level: &str, sink: LogSink) -> Result<(), LoggingError> {
    if GLOBAL.get().is_some() {
        return Ok(());
    }
    let severity = level.parse::<Severity>()?;
    let handle = LogHandle::new(severity, sink)?;
    // A concurrent first configure may have won; the first value is kept.
    let _ = GLOBAL.set(handle);
    Ok(())
}

/// The process-wide handle, if configured.
pub fn global() -> Option<&'static LogHandle> {
    GLOBAL.get()
}

pub fn debug(msg: &str) {
    if let Some(handle) = GLOBAL.get() {
        handle.debug(msg);
    }
}

pub fn info(msg: &str) {
    if let Some(handle) = GLOBAL.get() {
        handle.info(msg);
    }
}

pub fn warning(msg: &str) {
    if let Some(handle) = GLOBAL.get() {
        handle.warning(msg);
    }
}

pub fn error(msg: &str) {
    if let Some(handle) = GLOBAL.get() {
        handle.error(msg);
    }
}
