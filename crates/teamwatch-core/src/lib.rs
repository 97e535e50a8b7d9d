//! # teamwatch-core
//!
//! Core records, errors, and file access for the teamwatch monitoring
//! dashboard.
//!
//! This crate provides:
//! - [`TeamwatchError`] - Error types for file, config, and watcher operations
//! - [`logging`] - Tracing setup (stderr plus rolling JSON files)
//! - [`config`] - Monitor configuration (defaults, YAML file, environment)
//! - [`types`] - Team, task, and inbox message records
//! - [`reader`] - Reading team state from `~/.claude/`
//! - [`watcher`] - Debounced change notification per team
//!
//! ## Example
//!
//! ```no_run
//! use teamwatch_core::{MonitorConfig, TeamFileReader, logging};
//!
//! fn main() -> teamwatch_core::Result<()> {
//!     let _guard = logging::init_logging(None, 0)?;
//!
//!     let config = MonitorConfig::load(None)?;
//!     let reader = TeamFileReader::from_config(&config);
//!     for team in reader.list_teams()? {
//!         tracing::info!(team = %team, "found team");
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod reader;
pub mod types;
pub mod watcher;

pub use config::MonitorConfig;
pub use error::{Result, TeamwatchError};
pub use logging::{LogGuard, init_logging};
pub use reader::{TeamFileReader, TeamFileSummary, validate_identifier};
pub use types::{
    InboxMessage, MessagePayload, PermissionRequestBody, PermissionResponseBody, Task, TaskCounts,
    TaskStatus, TeamConfig, TeamMember, Timestamp,
};
pub use watcher::{TeamEvent, TeamWatcher, WatcherConfig};
