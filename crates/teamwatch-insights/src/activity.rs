//! Per-agent activity summaries.
//!
//! Combines three signals for every team member:
//!
//! - **Task ownership**: pending, in-progress and completed counts
//! - **Messages**: sent and received counts, and the latest one either way
//! - **Timeline**: the latest real status change on a task the agent owns
//!
//! The status is then derived from whether the agent still has open work,
//! whether it was asked to shut down, and how long it has been quiet.

use std::collections::HashSet;

use teamwatch_core::{InboxMessage, MessagePayload, Task, TaskStatus, TeamConfig, Timestamp};

use crate::thresholds::age_seconds;
use crate::timeline::TimelineTracker;
use crate::types::{AgentActivity, AgentStatus};

/// Activity for every member of `config`, in roster order.
pub fn compute_agent_activity(
    team: &str,
    config: &TeamConfig,
    tasks: &[Task],
    messages: &[InboxMessage],
    timeline: &TimelineTracker,
    stall_threshold_minutes: u64,
    now: Timestamp,
) -> Vec<AgentActivity> {
    let shutdown_requested: HashSet<&str> = messages
        .iter()
        .filter(|m| m.payload == MessagePayload::ShutdownRequest)
        .map(|m| m.target_agent.as_str())
        .collect();

    config
        .members
        .iter()
        .map(|member| {
            let name = member.name.as_str();
            let owned = tasks.iter().filter(|t| t.owner.as_deref() == Some(name));
            let count = |status: TaskStatus| {
                owned.clone().filter(|t| t.status == status).count() as u32
            };

            let last_message = messages
                .iter()
                .filter(|m| m.involves(name))
                .map(|m| m.timestamp)
                .max();
            let last_activity_at = last_message.max(timeline.last_activity_for(team, name));
            let minutes_since_last_activity = last_activity_at.map(|ts| age_seconds(ts, now) / 60);

            let mut activity = AgentActivity {
                agent_name: member.name.clone(),
                agent_color: member.color.clone(),
                agent_type: member.agent_type.clone(),
                model: member.model.clone(),
                last_activity_at,
                minutes_since_last_activity,
                messages_sent: messages.iter().filter(|m| m.from_agent == name).count() as u32,
                messages_received: messages.iter().filter(|m| m.target_agent == name).count()
                    as u32,
                ..AgentActivity::new(name, AgentStatus::Active)
            }
            .with_tasks(
                count(TaskStatus::Pending),
                count(TaskStatus::InProgress),
                count(TaskStatus::Completed),
            );

            let quiet = minutes_since_last_activity.is_some_and(|m| m > stall_threshold_minutes);
            activity.status = derive_status(
                activity.open_work() > 0,
                activity.tasks_completed > 0,
                shutdown_requested.contains(name),
                quiet,
            );
            activity.is_stalled = activity.status == AgentStatus::Stalled;
            activity
        })
        .collect()
}

/// Status from the agent's signals, first match wins.
fn derive_status(
    has_open_work: bool,
    has_completed: bool,
    shutdown: bool,
    quiet: bool,
) -> AgentStatus {
    match (shutdown || quiet, has_open_work) {
        (true, false) => AgentStatus::Completed,
        (true, true) => AgentStatus::Stalled,
        (false, false) if has_completed => AgentStatus::Idle,
        _ => AgentStatus::Active,
    }
}
