//! Tracing setup for the teamwatch binary.
//!
//! Two layers share one registry. Stdout is reserved for JSON output, so
//! the console layer writes to stderr and stays at `warn` unless `-v` is
//! given. The file layer writes JSON lines to a daily-rolling
//! `teamwatch.log.<date>` under `~/.teamwatch/logs/`, one level more
//! verbose than the console. `RUST_LOG` overrides both.
//!
//! ```no_run
//! let guard = teamwatch_core::init_logging(None, 1)?;
//! tracing::info!(log_dir = %guard.log_dir().display(), "started");
//! # Ok::<(), teamwatch_core::TeamwatchError>(())
//! ```

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{Result, TeamwatchError};

/// Prefix of the rolling log files.
pub const LOG_FILE_PREFIX: &str = "teamwatch.log";

const CRATES: [&str; 3] = ["teamwatch", "teamwatch_core", "teamwatch_insights"];

/// Flushes the file writer when dropped. Hold it until exit.
pub struct LogGuard {
    log_dir: PathBuf,
    _file_guard: WorkerGuard,
}

impl LogGuard {
    /// Directory the log files are written to.
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

/// Install the console and file layers.
///
/// `verbosity` is the number of `-v` flags.
pub fn init_logging(log_dir: Option<PathBuf>, verbosity: u8) -> Result<LogGuard> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };

    std::fs::create_dir_all(&log_dir).map_err(|e| TeamwatchError::DirectoryCreation {
        path: log_dir.clone(),
        source: e,
    })?;

    let (console_level, file_level) = levels(verbosity);

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_span_list(true)
        .with_filter(crate_filter(file_level));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(verbosity > 1)
        .with_line_number(verbosity > 1)
        .compact()
        .with_filter(crate_filter(console_level));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::debug!(log_dir = %log_dir.display(), verbosity, "logging initialized");

    Ok(LogGuard {
        log_dir,
        _file_guard: file_guard,
    })
}

/// Console and file levels for a `-v` count.
fn levels(verbosity: u8) -> (&'static str, &'static str) {
    match verbosity {
        0 => ("warn", "info"),
        1 => ("info", "debug"),
        _ => ("debug", "trace"),
    }
}

/// `RUST_LOG` when set, else `level` for teamwatch's own crates.
fn crate_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = CRATES.iter().map(|c| format!("{c}={level}")).collect();
        EnvFilter::new(directives.join(","))
    })
}

/// Console-only logging for tests. Safe to call more than once.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// `~/.teamwatch/logs/`
pub fn default_log_dir() -> Result<PathBuf> {
    Ok(crate::config::teamwatch_home()?.join("logs"))
}

/// Convenience macro for logging team-scoped events.
///
/// # Example
///
/// ```ignore
/// log_team_event!("alpha", "snapshot");
/// log_team_event!("alpha", "changed", paths = 3);
/// ```
#[macro_export]
macro_rules! log_team_event {
    ($team:expr, $event:expr) => {
        tracing::info!(
            target: "teamwatch::team",
            team = %$team,
            event = $event,
            "team event"
        )
    };
    ($team:expr, $event:expr, $($field:tt)*) => {
        tracing::info!(
            target: "teamwatch::team",
            team = %$team,
            event = $event,
            $($field)*,
            "team event"
        )
    };
}
