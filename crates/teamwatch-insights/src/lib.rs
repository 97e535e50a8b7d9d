//! # teamwatch-insights
//!
//! Derived team state for the teamwatch dashboard.
//!
//! The computations in this crate are pure: they take a snapshot of team
//! records plus an explicit `now` and return fresh values, so they can be
//! called from any number of concurrent pollers.
//!
//! - [`action_queue`] - Ranked list of items needing operator attention
//! - [`health_score`] - Weighted 0-100 health score with per-dimension detail
//! - [`messages`] - Pending permissions, unresolved requests, pair grouping
//! - [`activity`] - Per-agent status from tasks, messages and the timeline
//! - [`timeline`] - Task status-change history across polls
//! - [`agent_timeline`] - Per-agent lifecycle lanes
//! - [`notify`] - Dedup for new-permission notifications
//! - [`monitor`] - Reads a team and assembles all of the above
//!
//! The timeline and the notification dedup set are the only stateful
//! pieces, and both are owned by the caller.

pub mod action_queue;
pub mod agent_timeline;
pub mod activity;
pub mod health_score;
pub mod messages;
pub mod monitor;
pub mod notify;
pub mod thresholds;
pub mod timeline;
pub mod types;

pub use action_queue::build_action_queue;
pub use agent_timeline::{
    AgentLane, AgentTimeline, LifecycleEvent, LifecycleEventKind, build_agent_timeline,
};
pub use activity::compute_agent_activity;
pub use health_score::{compute_health_score, health_color};
pub use messages::{MessageGroup, group_by_pair, pending_permissions, unresolved_messages};
pub use monitor::{MessageQuery, MessageView, TeamMonitor, TeamSnapshot, TeamSummary};
pub use notify::SeenPermissions;
pub use timeline::{TimelineEvent, TimelineTracker};
pub use types::{
    ActionQueueItem, AgentActivity, AgentStatus, Category, DimensionScore, HealthColor,
    HealthScoreBreakdown, PendingPermission, PermissionData, Priority, RiskLevel,
};
