//! Logging infrastructure for charwatch.
//!
//! Structured logging via the `tracing` ecosystem. While the terminal UI owns
//! the screen, logs only go to a JSON-lines file; headless runs additionally
//! log to stderr.
//!
//! ## Example
//!
//! ```no_run
//! use charwatch_core::logging::{self, LogOutput};
//!
//! let _guard = logging::init_logging(None, false, LogOutput::FileOnly).expect("logging init");
//! tracing::info!("charwatch started");
//! tracing::debug!(character = "Aldric", "selected");
//! ```

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{CharwatchError, Result};

/// Guard that must be held to ensure log flushing on shutdown.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Where log records are written besides the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// JSON file only (the TUI owns stderr's terminal)
    FileOnly,
    /// JSON file plus compact human-readable stderr output
    FileAndConsole,
}

/// Initialize the charwatch logging system.
///
/// * `log_dir` - Optional custom log directory. Defaults to `~/.charwatch/logs/`
/// * `verbose` - If true, sets log level to DEBUG. Otherwise uses INFO.
/// * `output` - Whether to also log to stderr.
///
/// The returned [`LogGuard`] must be held for the application lifetime.
pub fn init_logging(log_dir: Option<PathBuf>, verbose: bool, output: LogOutput) -> Result<LogGuard> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };

    std::fs::create_dir_all(&log_dir).map_err(|e| CharwatchError::DirectoryCreation {
        path: log_dir.clone(),
        source: e,
    })?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "charwatch.log");
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "charwatch={default_level},charwatch_core={default_level},charwatch_link={default_level},charwatch_tui={default_level}"
        ))
    });

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_span_list(true);

    let console_layer = match output {
        LogOutput::FileOnly => None,
        LogOutput::FileAndConsole => Some(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(verbose)
                .with_line_number(verbose)
                .compact(),
        ),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::debug!(log_dir = %log_dir.display(), verbose, ?output, "logging initialized");

    Ok(LogGuard {
        _file_guard: Some(file_guard),
    })
}

/// Initialize minimal console-only logging for testing.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Root of all charwatch state: `~/.charwatch/`.
pub fn charwatch_home() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| CharwatchError::Internal {
        message: "home directory could not be determined".into(),
    })?;

    Ok(home.join(".charwatch"))
}

/// Get the default log directory path (`~/.charwatch/logs/`).
pub fn default_log_dir() -> Result<PathBuf> {
    Ok(charwatch_home()?.join("logs"))
}

/// Convenience macro for logging inbound frame handling.
///
/// ```ignore
/// log_frame_event!("snapshot", characters = 12);
/// log_frame_event!("delta", updates = 2, deletions = 1);
/// ```
#[macro_export]
macro_rules! log_frame_event {
    ($kind:expr, $($field:tt)*) => {
        tracing::debug!(
            target: "charwatch::frame",
            kind = $kind,
            $($field)*,
            "frame applied"
        )
    };
}

/// Convenience macro for logging connection phase transitions.
///
/// ```ignore
/// log_connection_event!(connection = 3, "opened");
/// ```
#[macro_export]
macro_rules! log_connection_event {
    ($($field:tt)*) => {
        tracing::info!(
            target: "charwatch::link",
            $($field)*
        )
    };
}
