//! Process-wide monitor configuration.
//!
//! Settings are resolved in three layers: built-in defaults, an optional YAML
//! file (`~/.teamwatch/config.yaml`), then environment overrides.
//!
//! | Variable                  | Field                     |
//! |---------------------------|---------------------------|
//! | `CLAUDE_HOME`             | `claude_home`             |
//! | `STALL_THRESHOLD_MINUTES` | `stall_threshold_minutes` |
//! | `TIMELINE_MAX_EVENTS`     | `timeline_max_events`     |
//! | `POLL_INTERVAL_MS`        | `poll_interval_ms`        |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TeamwatchError};

/// Default minutes without activity before an agent counts as stalled.
pub const DEFAULT_STALL_THRESHOLD_MINUTES: u64 = 10;

/// Default cap on retained timeline events.
pub const DEFAULT_TIMELINE_MAX_EVENTS: usize = 10_000;

/// Default refresh interval for polling consumers.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Default debounce for the directory watcher.
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Monitor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Root of the agent state tree (contains `teams/` and `tasks/`)
    pub claude_home: PathBuf,

    /// Minutes without activity before an agent with work is stalled
    pub stall_threshold_minutes: u64,

    /// Maximum task status-change events kept in memory
    pub timeline_max_events: usize,

    /// Refresh interval for polling consumers
    pub poll_interval_ms: u64,

    /// Debounce window for file change batches in watch mode
    pub debounce_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            claude_home: default_claude_home(),
            stall_threshold_minutes: DEFAULT_STALL_THRESHOLD_MINUTES,
            timeline_max_events: DEFAULT_TIMELINE_MAX_EVENTS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from defaults, a YAML file, and the environment.
    ///
    /// When `path` is None the default file is used if it exists. An
    /// explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_yaml(path)?,
            None => {
                let default_path = default_config_path()?;
                if default_path.exists() {
                    Self::from_yaml(&default_path)?
                } else {
                    debug!(path = %default_path.display(), "no config file, using defaults");
                    Self::default()
                }
            }
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a YAML file. Missing fields take defaults.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TeamwatchError::config_not_found_with_source(path, e))?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| TeamwatchError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(home) = non_empty_env("CLAUDE_HOME") {
            self.claude_home = PathBuf::from(home);
        }
        if let Some(minutes) = parse_env::<u64>("STALL_THRESHOLD_MINUTES")? {
            self.stall_threshold_minutes = minutes;
        }
        if let Some(max) = parse_env::<usize>("TIMELINE_MAX_EVENTS")? {
            self.timeline_max_events = max;
        }
        if let Some(interval) = parse_env::<u64>("POLL_INTERVAL_MS")? {
            self.poll_interval_ms = interval;
        }
        Ok(())
    }

    /// Check that thresholds are usable.
    pub fn validate(&self) -> Result<()> {
        if self.stall_threshold_minutes == 0 {
            return Err(TeamwatchError::ConfigValidation {
                message: "stall_threshold_minutes must be greater than 0".to_string(),
            });
        }
        if self.timeline_max_events == 0 {
            return Err(TeamwatchError::ConfigValidation {
                message: "timeline_max_events must be greater than 0".to_string(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(TeamwatchError::ConfigValidation {
                message: "poll_interval_ms must be greater than 0".to_string(),
            });
        }
        if self.debounce_ms == 0 {
            return Err(TeamwatchError::ConfigValidation {
                message: "debounce_ms must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Override the state root.
    pub fn with_claude_home(mut self, path: impl Into<PathBuf>) -> Self {
        self.claude_home = path.into();
        self
    }

    /// Override the stall threshold.
    pub fn with_stall_threshold_minutes(mut self, minutes: u64) -> Self {
        self.stall_threshold_minutes = minutes;
        self
    }

    /// Directory holding one subdirectory per team.
    pub fn teams_dir(&self) -> PathBuf {
        self.claude_home.join("teams")
    }

    /// Directory holding one task subdirectory per team.
    pub fn tasks_dir(&self) -> PathBuf {
        self.claude_home.join("tasks")
    }

    /// Stall threshold in seconds.
    pub fn stall_threshold_seconds(&self) -> u64 {
        self.stall_threshold_minutes * 60
    }

    /// Poll interval as a Duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Watcher debounce as a Duration.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Home directory of the current user.
fn home_dir() -> Result<PathBuf> {
    std::env::var("HOME")
        .ok()
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .ok_or_else(|| TeamwatchError::internal("HOME environment variable not set"))
}

/// teamwatch's own state directory (`~/.teamwatch`).
pub fn teamwatch_home() -> Result<PathBuf> {
    Ok(home_dir()?.join(".teamwatch"))
}

/// Default config file (`~/.teamwatch/config.yaml`).
pub fn default_config_path() -> Result<PathBuf> {
    Ok(teamwatch_home()?.join("config.yaml"))
}

fn default_claude_home() -> PathBuf {
    home_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".claude")
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match non_empty_env(name) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| TeamwatchError::ConfigEnv {
                variable: name.to_string(),
                value,
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const OVERRIDES: [&str; 4] = [
        "CLAUDE_HOME",
        "STALL_THRESHOLD_MINUTES",
        "TIMELINE_MAX_EVENTS",
        "POLL_INTERVAL_MS",
    ];

    fn clear_overrides() {
        for var in OVERRIDES {
            // SAFETY: env-mutating tests are #[serial]
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_overrides();
        // SAFETY: serialized test
        unsafe { std::env::set_var("HOME", "/tmp/test-home") };
        let config = MonitorConfig::default();
        assert_eq!(config.claude_home, PathBuf::from("/tmp/test-home/.claude"));
        assert_eq!(config.teams_dir(), PathBuf::from("/tmp/test-home/.claude/teams"));
        assert_eq!(config.tasks_dir(), PathBuf::from("/tmp/test-home/.claude/tasks"));
        assert_eq!(config.stall_threshold_seconds(), 600);
        assert_eq!(config.poll_interval(), Duration::from_millis(2000));
    }

    #[test]
    #[serial]
    fn test_yaml_partial_fields_use_defaults() {
        clear_overrides();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "claude_home: /srv/agents\nstall_threshold_minutes: 5\n").unwrap();

        let config = MonitorConfig::load(Some(&path)).unwrap();
        assert_eq!(config.claude_home, PathBuf::from("/srv/agents"));
        assert_eq!(config.stall_threshold_minutes, 5);
        assert_eq!(config.timeline_max_events, DEFAULT_TIMELINE_MAX_EVENTS);
    }

    #[test]
    #[serial]
    fn test_explicit_missing_file_is_error() {
        clear_overrides();
        let err = MonitorConfig::load(Some(Path::new("/nonexistent/teamwatch.yaml"))).unwrap_err();
        assert!(matches!(err, TeamwatchError::ConfigNotFound { .. }));
    }

    #[test]
    #[serial]
    fn test_invalid_yaml() {
        clear_overrides();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "stall_threshold_minutes: [not a number").unwrap();

        let err = MonitorConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, TeamwatchError::ConfigInvalid { .. }));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_overrides();
        let home = TempDir::new().unwrap();
        // SAFETY: serialized test
        unsafe {
            std::env::set_var("HOME", home.path());
            std::env::set_var("CLAUDE_HOME", "/data/claude");
            std::env::set_var("STALL_THRESHOLD_MINUTES", "3");
        }

        let config = MonitorConfig::load(None).unwrap();
        clear_overrides();

        assert_eq!(config.claude_home, PathBuf::from("/data/claude"));
        assert_eq!(config.stall_threshold_minutes, 3);
    }

    #[test]
    #[serial]
    fn test_bad_env_value() {
        clear_overrides();
        let home = TempDir::new().unwrap();
        // SAFETY: serialized test
        unsafe {
            std::env::set_var("HOME", home.path());
            std::env::set_var("STALL_THRESHOLD_MINUTES", "ten");
        }

        let err = MonitorConfig::load(None).unwrap_err();
        clear_overrides();
        assert!(matches!(err, TeamwatchError::ConfigEnv { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let config = MonitorConfig::default().with_stall_threshold_minutes(0);
        assert!(matches!(
            config.validate(),
            Err(TeamwatchError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let config = MonitorConfig {
            poll_interval_ms: 0,
            ..MonitorConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("poll_interval_ms"));

        let config = MonitorConfig {
            debounce_ms: 0,
            ..MonitorConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("debounce_ms"));

        assert!(MonitorConfig::default().validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_zero_poll_interval_from_env_is_rejected() {
        clear_overrides();
        let home = TempDir::new().unwrap();
        // SAFETY: serialized test
        unsafe {
            std::env::set_var("HOME", home.path());
            std::env::set_var("POLL_INTERVAL_MS", "0");
        }

        let err = MonitorConfig::load(None).unwrap_err();
        clear_overrides();
        assert!(matches!(err, TeamwatchError::ConfigValidation { .. }));
    }
}
