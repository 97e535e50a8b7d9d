//! Derived records produced by the insights computations.
//!
//! Everything here is a value object built fresh per call. Field names are
//! serialized in camelCase to match the rest of the dashboard payloads.

use serde::{Deserialize, Serialize};
use teamwatch_core::Timestamp;

/// An outstanding tool-use approval request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPermission {
    pub request_id: String,
    pub tool_use_id: String,
    pub tool_name: String,
    /// Agent that asked for the permission
    pub agent_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_color: Option<String>,
    pub description: String,
    pub created_at: Timestamp,
}

/// Agent status derived from activity and task ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Idle,
    Stalled,
    Completed,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Idle => "idle",
            Self::Stalled => "stalled",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-agent activity snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentActivity {
    pub agent_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_color: Option<String>,
    pub agent_type: String,
    pub model: String,
    pub status: AgentStatus,
    /// Always equal to `status == Stalled`
    pub is_stalled: bool,
    /// Whole minutes since the last observed activity, None if never active
    pub minutes_since_last_activity: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity_at: Option<Timestamp>,
    pub tasks_pending: u32,
    pub tasks_in_progress: u32,
    pub tasks_completed: u32,
    pub messages_sent: u32,
    pub messages_received: u32,
}

impl AgentActivity {
    /// An agent with no work, messages, or activity yet.
    pub fn new(agent_name: impl Into<String>, status: AgentStatus) -> Self {
        Self {
            agent_name: agent_name.into(),
            agent_color: None,
            agent_type: String::new(),
            model: String::new(),
            status,
            is_stalled: status == AgentStatus::Stalled,
            minutes_since_last_activity: None,
            last_activity_at: None,
            tasks_pending: 0,
            tasks_in_progress: 0,
            tasks_completed: 0,
            messages_sent: 0,
            messages_received: 0,
        }
    }

    /// Set pending, in-progress and completed task counts.
    pub fn with_tasks(mut self, pending: u32, in_progress: u32, completed: u32) -> Self {
        self.tasks_pending = pending;
        self.tasks_in_progress = in_progress;
        self.tasks_completed = completed;
        self
    }

    pub fn with_minutes_idle(mut self, minutes: u64) -> Self {
        self.minutes_since_last_activity = Some(minutes);
        self
    }

    /// Pending plus in-progress tasks.
    pub fn open_work(&self) -> u32 {
        self.tasks_pending + self.tasks_in_progress
    }
}

/// Action queue item kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Permission,
    StalledAgent,
    BlockedTask,
}

/// Action queue priority. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical = 0,
    High = 1,
    Normal = 2,
}

impl Priority {
    /// Sort rank, lower is shown first.
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

/// Risk badge for a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
}

/// Identifiers needed to approve or deny a permission request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionData {
    pub request_id: String,
    pub tool_use_id: String,
    pub tool_name: String,
}

/// One entry of the action queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionQueueItem {
    /// `perm:{requestId}`, `stall:{agentName}` or `blocked:{taskId}`
    pub id: String,
    pub category: Category,
    pub priority: Priority,
    pub title: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_data: Option<PermissionData>,
}

/// Health band color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthColor {
    Green,
    Amber,
    Red,
}

impl HealthColor {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Green => "Healthy",
            Self::Amber => "Needs Attention",
            Self::Red => "Critical",
        }
    }
}

/// One weighted component of the health score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionScore {
    pub name: String,
    /// 0 to 100
    pub score: u8,
    pub weight: f64,
    pub explanation: String,
}

/// Composite team health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthScoreBreakdown {
    /// 0 to 100
    pub overall: u8,
    pub color: HealthColor,
    pub label: String,
    pub dimensions: Vec<DimensionScore>,
}
