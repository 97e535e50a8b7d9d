//! Team file reader for `~/.claude/teams/` and `~/.claude/tasks/`.
//!
//! Reads team configs, task files, and agent inboxes, handling missing files
//! and invalid JSON gracefully: a missing directory reads as empty and a
//! malformed file is skipped with a warning.
//!
//! ## Layout
//!
//! ```text
//! teams/<team>/config.json
//! teams/<team>/inboxes/<agent>.json
//! tasks/<team>/<task-id>.json
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use teamwatch_core::{MonitorConfig, TeamFileReader};
//!
//! fn main() -> teamwatch_core::Result<()> {
//!     let reader = TeamFileReader::from_config(&MonitorConfig::default());
//!
//!     for team in reader.list_teams()? {
//!         let tasks = reader.tasks(&team)?;
//!         println!("{}: {} tasks", team, tasks.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::MonitorConfig;
use crate::error::{Result, TeamwatchError};
use crate::types::{InboxMessage, MessagePayload, Task, TaskCounts, TeamConfig};

/// Check a team or agent identifier before it is joined into a path.
///
/// Identifiers must be non-empty and contain only ASCII letters, digits,
/// `_` and `-`.
pub fn validate_identifier<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(value)
    } else {
        Err(TeamwatchError::invalid_identifier(field, value))
    }
}

/// Inbox entry as written by agents.
#[derive(Debug, Deserialize)]
struct RawInboxMessage {
    #[serde(default)]
    from: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    read: bool,
}

/// Per-team counts and flags for list views.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamFileSummary {
    pub config: TeamConfig,
    pub counts: TaskCounts,
    pub total_tasks: usize,
    pub has_unread_messages: bool,
}

/// Reader for team state files.
#[derive(Debug, Clone)]
pub struct TeamFileReader {
    teams_dir: PathBuf,
    tasks_dir: PathBuf,
}

impl TeamFileReader {
    /// Create a reader over explicit teams and tasks directories.
    pub fn new(teams_dir: impl Into<PathBuf>, tasks_dir: impl Into<PathBuf>) -> Self {
        let teams_dir = teams_dir.into();
        let tasks_dir = tasks_dir.into();
        debug!(teams_dir = ?teams_dir, tasks_dir = ?tasks_dir, "TeamFileReader initialized");
        Self {
            teams_dir,
            tasks_dir,
        }
    }

    /// Create a reader over the directories named by a config.
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.teams_dir(), config.tasks_dir())
    }

    pub fn teams_dir(&self) -> &Path {
        &self.teams_dir
    }

    pub fn tasks_dir(&self) -> &Path {
        &self.tasks_dir
    }

    /// Team directory names, sorted.
    pub fn list_teams(&self) -> Result<Vec<String>> {
        if !self.teams_dir.exists() {
            debug!("Teams directory does not exist: {:?}", self.teams_dir);
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.teams_dir)
            .map_err(|e| TeamwatchError::io("reading teams directory", &self.teams_dir, e))?;

        let mut teams: Vec<String> = entries
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(e) => {
                    warn!("Failed to read directory entry: {}", e);
                    None
                }
            })
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();

        teams.sort();
        Ok(teams)
    }

    /// Read a team's `config.json`.
    ///
    /// Returns `None` if the file is missing or cannot be parsed.
    pub fn team_config(&self, team: &str) -> Result<Option<TeamConfig>> {
        let path = self.teams_dir.join(team).join("config.json");
        if !path.exists() {
            debug!("Team config not found: {:?}", path);
            return Ok(None);
        }

        match read_json::<TeamConfig>(&path) {
            Ok(mut config) => {
                if config.name.is_empty() {
                    config.name = team.to_string();
                }
                Ok(Some(config))
            }
            Err(e) => {
                warn!("Failed to parse team config {:?}: {}", path, e);
                Ok(None)
            }
        }
    }

    /// Read all task files for a team, sorted by file name.
    ///
    /// Non-JSON files (such as `.lock` files) are ignored. A task without an
    /// `id` takes its file stem.
    pub fn tasks(&self, team: &str) -> Result<Vec<Task>> {
        let dir = self.tasks_dir.join(team);
        let mut tasks = Vec::new();

        for path in json_files(&dir)? {
            match read_json::<Task>(&path) {
                Ok(mut task) => {
                    if task.id.is_empty() {
                        task.id = file_stem(&path).unwrap_or_default();
                    }
                    task.is_internal = task.marked_internal();
                    tasks.push(task);
                }
                Err(e) => warn!("Skipping task file {:?}: {}", path, e),
            }
        }

        debug!(team, count = tasks.len(), "read tasks");
        Ok(tasks)
    }

    /// Read one agent's inbox, tagging each message with the inbox owner.
    pub fn inbox(&self, team: &str, agent: &str) -> Result<Vec<InboxMessage>> {
        let path = self.inbox_path(team, agent);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let raw: Vec<RawInboxMessage> = match read_json(&path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to parse inbox {:?}: {}", path, e);
                return Ok(Vec::new());
            }
        };

        let messages = raw
            .into_iter()
            .filter_map(|m| {
                let timestamp = match parse_timestamp(&m.timestamp) {
                    Some(ts) => ts,
                    None => {
                        warn!(inbox = ?path, timestamp = %m.timestamp, "Skipping message with invalid timestamp");
                        return None;
                    }
                };
                Some(InboxMessage {
                    payload: MessagePayload::parse(&m.text),
                    from_agent: m.from,
                    target_agent: agent.to_string(),
                    text: m.text,
                    timestamp,
                    color: m.color,
                    read: m.read,
                })
            })
            .collect();

        Ok(messages)
    }

    /// Every inbox of a team merged into one list, oldest first.
    pub fn all_messages(&self, team: &str) -> Result<Vec<InboxMessage>> {
        let dir = self.teams_dir.join(team).join("inboxes");
        let mut messages = Vec::new();

        for path in json_files(&dir)? {
            if let Some(agent) = file_stem(&path) {
                messages.extend(self.inbox(team, &agent)?);
            }
        }

        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }

    /// Config, task counts, and unread flag for a team.
    ///
    /// Returns `None` when the team has no readable config.
    pub fn team_summary(&self, team: &str) -> Result<Option<TeamFileSummary>> {
        let Some(config) = self.team_config(team)? else {
            return Ok(None);
        };

        let tasks = self.tasks(team)?;
        let has_unread_messages = self.all_messages(team)?.iter().any(|m| !m.read);

        Ok(Some(TeamFileSummary {
            config,
            counts: TaskCounts::from_tasks(&tasks),
            total_tasks: tasks.len(),
            has_unread_messages,
        }))
    }

    /// Path of an agent's inbox file.
    pub fn inbox_path(&self, team: &str, agent: &str) -> PathBuf {
        self.teams_dir
            .join(team)
            .join("inboxes")
            .join(format!("{}.json", agent))
    }
}

/// Accepts RFC 3339 (`2026-03-01T12:00:00.000Z`) and offset-less ISO
/// timestamps, which are taken as UTC.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
}

/// `*.json` files directly inside `dir`, sorted. Missing dir reads as empty.
fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries =
        std::fs::read_dir(dir).map_err(|e| TeamwatchError::io("reading directory", dir, e))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();

    files.sort();
    Ok(files)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| TeamwatchError::io("reading team file", path, e))?;

    serde_json::from_str(&content).map_err(|e| TeamwatchError::TeamFileParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
