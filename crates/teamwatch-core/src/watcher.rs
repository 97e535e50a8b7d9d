//! Debounced file watching over the teams and tasks directories.
//!
//! Agents rewrite config, inbox, and task files constantly while a team is
//! running. The watcher coalesces those writes with `notify-debouncer-full`
//! and emits one [`TeamEvent::Changed`] per affected team per batch, so a
//! consumer can recompute that team's snapshot once.
//!
//! ## Example
//!
//! ```no_run
//! use teamwatch_core::watcher::{TeamEvent, TeamWatcher, WatcherConfig};
//! use teamwatch_core::MonitorConfig;
//!
//! #[tokio::main]
//! async fn main() -> teamwatch_core::Result<()> {
//!     let config = WatcherConfig::from_monitor_config(&MonitorConfig::default());
//!     let (_watcher, mut rx) = TeamWatcher::with_config(config)?;
//!
//!     while let Some(event) = rx.recv().await {
//!         match event {
//!             TeamEvent::Changed { team, .. } => println!("{} changed", team),
//!             TeamEvent::Error { error } => eprintln!("watch error: {}", error),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{
    new_debouncer, DebounceEventResult, DebouncedEvent, Debouncer, RecommendedCache,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::MonitorConfig;
use crate::error::{Result, TeamwatchError};

/// Default channel buffer size for events.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Events emitted by the team watcher.
#[derive(Debug, Clone, PartialEq)]
pub enum TeamEvent {
    /// One or more JSON files belonging to a team changed.
    Changed {
        /// Team directory name
        team: String,
        /// Changed files in this batch
        paths: Vec<PathBuf>,
    },

    /// The underlying watcher reported an error. Watching continues.
    Error { error: String },
}

impl TeamEvent {
    /// Team this event refers to, if any.
    pub fn team(&self) -> Option<&str> {
        match self {
            Self::Changed { team, .. } => Some(team),
            Self::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Configuration for the team watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub teams_dir: PathBuf,
    pub tasks_dir: PathBuf,
    /// Debounce duration for coalescing rapid changes
    pub debounce_duration: Duration,
    /// Channel buffer size for events
    pub channel_buffer: usize,
    /// Only report this team when set
    pub team_filter: Option<String>,
}

impl WatcherConfig {
    pub fn new(teams_dir: PathBuf, tasks_dir: PathBuf) -> Self {
        Self {
            teams_dir,
            tasks_dir,
            debounce_duration: Duration::from_millis(crate::config::DEFAULT_DEBOUNCE_MS),
            channel_buffer: DEFAULT_CHANNEL_BUFFER,
            team_filter: None,
        }
    }

    pub fn from_monitor_config(config: &MonitorConfig) -> Self {
        Self::new(config.teams_dir(), config.tasks_dir()).with_debounce(config.debounce())
    }

    pub fn with_debounce(mut self, duration: Duration) -> Self {
        self.debounce_duration = duration;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer = size;
        self
    }

    pub fn with_team_filter(mut self, team: impl Into<String>) -> Self {
        self.team_filter = Some(team.into());
        self
    }
}

/// Watches the teams and tasks trees and reports changed teams.
pub struct TeamWatcher {
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    teams_dir: PathBuf,
    tasks_dir: PathBuf,
}

impl TeamWatcher {
    /// Start watching. Missing directories are created first.
    ///
    /// Returns the watcher, which must be kept alive, and the event receiver.
    pub fn with_config(config: WatcherConfig) -> Result<(Self, mpsc::Receiver<TeamEvent>)> {
        let (event_tx, event_rx) = mpsc::channel(config.channel_buffer);

        for dir in [&config.teams_dir, &config.tasks_dir] {
            if !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| TeamwatchError::DirectoryCreation {
                    path: dir.clone(),
                    source: e,
                })?;
                info!("Created directory: {:?}", dir);
            }
        }

        let roots = [config.teams_dir.clone(), config.tasks_dir.clone()];
        let filter = config.team_filter.clone();

        let mut debouncer = new_debouncer(
            config.debounce_duration,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    for event in group_by_team(&events, &roots, filter.as_deref()) {
                        if event_tx.blocking_send(event).is_err() {
                            warn!("Event receiver dropped, discarding team change");
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        error!("File watcher error: {:?}", error);
                        let _ = event_tx.blocking_send(TeamEvent::Error {
                            error: format!("{:?}", error),
                        });
                    }
                }
            },
        )
        .map_err(|e| TeamwatchError::WatcherInit {
            message: format!("Failed to create debouncer: {}", e),
        })?;

        for dir in [&config.teams_dir, &config.tasks_dir] {
            debouncer
                .watch(dir, RecursiveMode::Recursive)
                .map_err(|e| TeamwatchError::WatcherInit {
                    message: format!("Failed to watch directory {:?}: {}", dir, e),
                })?;
        }

        info!(teams_dir = ?config.teams_dir, tasks_dir = ?config.tasks_dir, "Started watching team files");

        Ok((
            Self {
                _debouncer: debouncer,
                teams_dir: config.teams_dir,
                tasks_dir: config.tasks_dir,
            },
            event_rx,
        ))
    }

    pub fn teams_dir(&self) -> &Path {
        &self.teams_dir
    }

    pub fn tasks_dir(&self) -> &Path {
        &self.tasks_dir
    }
}

/// Collapse a debounced batch into one Changed event per team.
fn group_by_team(
    events: &[DebouncedEvent],
    roots: &[PathBuf],
    filter: Option<&str>,
) -> Vec<TeamEvent> {
    let mut by_team: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

    for event in events {
        if event.event.kind.is_access() {
            continue;
        }
        for path in &event.event.paths {
            let Some(team) = team_for_path(path, roots) else {
                continue;
            };
            if filter.is_some_and(|f| f != team) {
                continue;
            }
            let paths = by_team.entry(team).or_default();
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }
    }

    by_team
        .into_iter()
        .map(|(team, paths)| {
            debug!(team = %team, changed = paths.len(), "team files changed");
            TeamEvent::Changed { team, paths }
        })
        .collect()
}

/// Team name for a changed JSON file under one of the roots.
///
/// The team is the first path component below the root; the file must sit
/// deeper than that component.
fn team_for_path(path: &Path, roots: &[PathBuf]) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return None;
    }

    roots.iter().find_map(|root| {
        let relative = path.strip_prefix(root).ok()?;
        let mut components = relative.components();
        let team = components.next()?.as_os_str().to_str()?.to_string();
        components.next()?;
        Some(team)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn roots() -> Vec<PathBuf> {
        vec![PathBuf::from("/c/teams"), PathBuf::from("/c/tasks")]
    }

    #[test]
    fn test_team_for_path() {
        let roots = roots();
        assert_eq!(
            team_for_path(Path::new("/c/teams/alpha/config.json"), &roots),
            Some("alpha".into())
        );
        assert_eq!(
            team_for_path(Path::new("/c/teams/alpha/inboxes/dev.json"), &roots),
            Some("alpha".into())
        );
        assert_eq!(
            team_for_path(Path::new("/c/tasks/beta/4.json"), &roots),
            Some("beta".into())
        );
        assert_eq!(team_for_path(Path::new("/c/tasks/beta/4.json.lock"), &roots), None);
        assert_eq!(team_for_path(Path::new("/c/teams/top.json"), &roots), None);
        assert_eq!(team_for_path(Path::new("/elsewhere/x/y.json"), &roots), None);
    }

    #[test]
    fn test_watcher_config_custom() {
        let config = WatcherConfig::new(PathBuf::from("/t"), PathBuf::from("/k"))
            .with_debounce(Duration::from_millis(10))
            .with_buffer_size(8)
            .with_team_filter("alpha");

        assert_eq!(config.debounce_duration, Duration::from_millis(10));
        assert_eq!(config.channel_buffer, 8);
        assert_eq!(config.team_filter.as_deref(), Some("alpha"));
    }

    #[test]
    fn test_team_event_accessors() {
        let changed = TeamEvent::Changed {
            team: "alpha".into(),
            paths: vec![],
        };
        assert_eq!(changed.team(), Some("alpha"));
        assert!(!changed.is_error());

        let error = TeamEvent::Error {
            error: "boom".into(),
        };
        assert_eq!(error.team(), None);
        assert!(error.is_error());
    }

    #[tokio::test]
    async fn test_watcher_creates_directories() {
        let tmp = TempDir::new().unwrap();
        let teams = tmp.path().join("teams");
        let tasks = tmp.path().join("tasks");

        let config = WatcherConfig::new(teams.clone(), tasks.clone());
        let (_watcher, _rx) = TeamWatcher::with_config(config).unwrap();

        assert!(teams.exists());
        assert!(tasks.exists());
    }

    #[tokio::test]
    async fn test_watcher_reports_task_change() {
        let tmp = TempDir::new().unwrap();
        let teams = tmp.path().join("teams");
        let tasks = tmp.path().join("tasks");
        fs::create_dir_all(tasks.join("alpha")).unwrap();

        let config = WatcherConfig::new(teams, tasks.clone()).with_debounce(Duration::from_millis(20));
        let (_watcher, mut rx) = TeamWatcher::with_config(config).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(tasks.join("alpha/1.json"), r#"{"id":"1","status":"pending"}"#).unwrap();

        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("Timeout waiting for event")
            .expect("Channel closed");

        assert_eq!(event.team(), Some("alpha"));
    }

    #[tokio::test]
    async fn test_watcher_ignores_non_json_files() {
        let tmp = TempDir::new().unwrap();
        let teams = tmp.path().join("teams");
        let tasks = tmp.path().join("tasks");
        fs::create_dir_all(tasks.join("alpha")).unwrap();

        let config = WatcherConfig::new(teams, tasks.clone()).with_debounce(Duration::from_millis(20));
        let (_watcher, mut rx) = TeamWatcher::with_config(config).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(tasks.join("alpha/1.json.lock"), "").unwrap();

        let result = tokio::time::timeout(Duration::from_millis(400), rx.recv()).await;
        assert!(result.is_err(), "Should not receive event for non-JSON file");
    }
}
