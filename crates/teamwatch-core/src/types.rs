//! Team records as stored on disk.
//!
//! Config and task files use camelCase keys; the structured payloads embedded
//! in inbox message text use snake_case keys. Both shapes are preserved on
//! output so consumers see the same field names the agents write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp type used throughout teamwatch.
pub type Timestamp = DateTime<Utc>;

/// One agent listed in a team's `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamMember {
    pub agent_id: String,
    pub name: String,
    pub agent_type: String,
    pub model: String,
    /// Unix milliseconds
    pub joined_at: i64,
    pub cwd: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmux_pane_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_type: Option<String>,
}

/// A team's `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamConfig {
    pub name: String,
    pub description: String,
    /// Unix milliseconds
    pub created_at: i64,
    pub lead_agent_id: String,
    pub lead_session_id: String,
    pub members: Vec<TeamMember>,
}

/// Task lifecycle status.
///
/// Unrecognized strings are preserved in [`TaskStatus::Other`] and are not
/// counted in any [`TaskCounts`] bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => Self::Pending,
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            _ => Self::Other(value),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(value: TaskStatus) -> Self {
        match value {
            TaskStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task file from `tasks/<team>/<id>.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Task {
    pub id: String,
    pub subject: String,
    pub description: String,
    pub status: TaskStatus,
    pub blocks: Vec<String>,
    pub blocked_by: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Seconds since the last observed status change; filled in by the
    /// timeline, never read from disk.
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub status_duration_seconds: Option<u64>,
    /// Copy of the `metadata._internal` flag; set by the reader.
    #[serde(skip_deserializing)]
    pub is_internal: bool,
}

impl Task {
    /// Create a task with an id, subject and status.
    pub fn new(id: impl Into<String>, subject: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            status,
            ..Default::default()
        }
    }

    /// Set the owner and return self for chaining.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Set the blocker ids and return self for chaining.
    pub fn with_blocked_by<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked_by = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// True for bookkeeping tasks the agents mark with `metadata._internal`.
    pub fn marked_internal(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("_internal"))
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

/// Aggregated task totals per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub pending: u32,
    pub in_progress: u32,
    pub completed: u32,
}

impl TaskCounts {
    pub fn new(pending: u32, in_progress: u32, completed: u32) -> Self {
        Self {
            pending,
            in_progress,
            completed,
        }
    }

    /// Count tasks by status. Unrecognized statuses are ignored.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        tasks.iter().fold(Self::default(), |mut counts, task| {
            match task.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::InProgress => counts.in_progress += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Other(_) => {}
            }
            counts
        })
    }

    pub fn total(&self) -> u32 {
        self.pending + self.in_progress + self.completed
    }
}

/// Body of a `permission_request` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionRequestBody {
    pub request_id: String,
    pub tool_use_id: String,
    pub tool_name: String,
    pub description: String,
}

/// Body of a `permission_response` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionResponseBody {
    pub request_id: String,
    pub tool_use_id: String,
    pub approved: bool,
}

/// Structured content carried in an inbox message's `text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePayload {
    /// Free text, or JSON without a `type` field
    Plain,
    PermissionRequest(PermissionRequestBody),
    PermissionResponse(PermissionResponseBody),
    ShutdownRequest,
    ShutdownResponse,
    /// A typed message teamwatch does not interpret
    Other { kind: String },
}

impl MessagePayload {
    /// Classify message text.
    ///
    /// Text that is a JSON object with a string `type` is structured; known
    /// types are decoded into typed bodies and everything else is `Other`.
    pub fn parse(text: &str) -> Self {
        let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(text)
        else {
            return Self::Plain;
        };
        let Some(kind) = map.get("type").and_then(serde_json::Value::as_str) else {
            return Self::Plain;
        };
        let kind = kind.to_string();
        let value = serde_json::Value::Object(map);

        match kind.as_str() {
            "permission_request" => serde_json::from_value(value)
                .map(Self::PermissionRequest)
                .unwrap_or(Self::Other { kind }),
            "permission_response" => serde_json::from_value(value)
                .map(Self::PermissionResponse)
                .unwrap_or(Self::Other { kind }),
            "shutdown_request" => Self::ShutdownRequest,
            "shutdown_response" => Self::ShutdownResponse,
            _ => Self::Other { kind },
        }
    }

    /// The `type` string this payload was classified as.
    pub fn kind(&self) -> &str {
        match self {
            Self::Plain => "plain",
            Self::PermissionRequest(_) => "permission_request",
            Self::PermissionResponse(_) => "permission_response",
            Self::ShutdownRequest => "shutdown_request",
            Self::ShutdownResponse => "shutdown_response",
            Self::Other { kind } => kind,
        }
    }
}

/// A message read from an agent inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxMessage {
    pub from_agent: String,
    /// Owner of the inbox the message was read from
    pub target_agent: String,
    pub text: String,
    pub timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub read: bool,
    pub payload: MessagePayload,
}

impl InboxMessage {
    /// Build a message, classifying `text` into a payload.
    pub fn new(
        from_agent: impl Into<String>,
        target_agent: impl Into<String>,
        text: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        let text = text.into();
        Self {
            from_agent: from_agent.into(),
            target_agent: target_agent.into(),
            payload: MessagePayload::parse(&text),
            text,
            timestamp,
            color: None,
            read: false,
        }
    }

    /// Set the sender color and return self for chaining.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn message_type(&self) -> &str {
        self.payload.kind()
    }

    /// True if this message was sent or received by `agent`.
    pub fn involves(&self, agent: &str) -> bool {
        self.from_agent == agent || self.target_agent == agent
    }
}
