//! Ranked "needs attention now" list for a team.
//!
//! Three sources feed the queue:
//!
//! - **Permissions**: every pending tool-use request; critical once it has
//!   waited [`PERMISSION_CRITICAL_SECONDS`], otherwise high
//! - **Stalled agents**: stalled agents that still own pending or in-progress
//!   work; critical once idle for more than twice the stall threshold
//! - **Blocked tasks**: unfinished tasks with an unfinished blocker; always
//!   normal
//!
//! Items are ordered by priority, then longest-waiting first. Items without a
//! duration go last within their priority.

use std::cmp::Ordering;

use teamwatch_core::{Task, Timestamp};

use crate::thresholds::{
    PERMISSION_CRITICAL_SECONDS, STALL_CRITICAL_MULTIPLIER, age_seconds, completed_ids,
    open_blockers, tool_risk_level,
};
use crate::types::{
    ActionQueueItem, AgentActivity, AgentStatus, Category, PendingPermission, PermissionData,
    Priority,
};

/// Build the action queue from one consistent team snapshot.
pub fn build_action_queue(
    pending_permissions: &[PendingPermission],
    activity: &[AgentActivity],
    tasks: &[Task],
    stall_threshold_seconds: u64,
    now: Timestamp,
) -> Vec<ActionQueueItem> {
    let mut items: Vec<ActionQueueItem> = Vec::new();

    items.extend(
        pending_permissions
            .iter()
            .map(|perm| permission_item(perm, now)),
    );

    items.extend(
        activity
            .iter()
            .filter_map(|agent| stalled_agent_item(agent, tasks, stall_threshold_seconds)),
    );

    let completed = completed_ids(tasks);
    items.extend(tasks.iter().filter(|t| !t.is_completed()).filter_map(|task| {
        let blockers = open_blockers(task, &completed);
        (!blockers.is_empty()).then(|| blocked_task_item(task, &blockers))
    }));

    // Vec::sort_by is stable, so equal items keep source order.
    items.sort_by(compare_items);
    items
}

fn permission_item(perm: &PendingPermission, now: Timestamp) -> ActionQueueItem {
    let age = age_seconds(perm.created_at, now);
    let priority = if age >= PERMISSION_CRITICAL_SECONDS {
        Priority::Critical
    } else {
        Priority::High
    };

    ActionQueueItem {
        id: format!("perm:{}", perm.request_id),
        category: Category::Permission,
        priority,
        title: format!("Permission request: {}", perm.tool_name),
        detail: perm.description.clone(),
        agent_name: Some(perm.agent_name.clone()),
        agent_color: perm.agent_color.clone(),
        created_at: Some(perm.created_at),
        duration_seconds: Some(age),
        risk_level: tool_risk_level(&perm.tool_name),
        permission_data: Some(PermissionData {
            request_id: perm.request_id.clone(),
            tool_use_id: perm.tool_use_id.clone(),
            tool_name: perm.tool_name.clone(),
        }),
    }
}

fn stalled_agent_item(
    agent: &AgentActivity,
    tasks: &[Task],
    stall_threshold_seconds: u64,
) -> Option<ActionQueueItem> {
    if agent.status != AgentStatus::Stalled || agent.open_work() == 0 {
        return None;
    }

    let minutes = agent.minutes_since_last_activity.unwrap_or(0);
    let stall_seconds = minutes * 60;
    let priority = if stall_seconds > stall_threshold_seconds * STALL_CRITICAL_MULTIPLIER {
        Priority::Critical
    } else {
        Priority::High
    };

    let mut detail = format!(
        "No activity for {}m. {} pending, {} in progress.",
        minutes, agent.tasks_pending, agent.tasks_in_progress
    );
    let last_completed = tasks
        .iter()
        .rev()
        .find(|t| t.is_completed() && t.owner.as_deref() == Some(agent.agent_name.as_str()));
    if let Some(task) = last_completed {
        detail.push_str(&format!(" Last completed: \"{}\"", task.subject));
    }

    Some(ActionQueueItem {
        id: format!("stall:{}", agent.agent_name),
        category: Category::StalledAgent,
        priority,
        title: format!("{} is stalled", agent.agent_name),
        detail,
        agent_name: Some(agent.agent_name.clone()),
        agent_color: agent.agent_color.clone(),
        created_at: agent.last_activity_at,
        duration_seconds: Some(stall_seconds),
        risk_level: None,
        permission_data: None,
    })
}

fn blocked_task_item(task: &Task, blockers: &[&str]) -> ActionQueueItem {
    ActionQueueItem {
        id: format!("blocked:{}", task.id),
        category: Category::BlockedTask,
        priority: Priority::Normal,
        title: format!("Task #{} blocked", task.id),
        detail: format!("\"{}\" blocked by #{}", task.subject, blockers.join(", #")),
        agent_name: task.owner.clone(),
        agent_color: None,
        created_at: None,
        duration_seconds: task.status_duration_seconds,
        risk_level: None,
        permission_data: None,
    }
}

/// Priority rank ascending, then duration descending with `None` last.
fn compare_items(a: &ActionQueueItem, b: &ActionQueueItem) -> Ordering {
    a.priority
        .rank()
        .cmp(&b.priority.rank())
        .then_with(|| match (a.duration_seconds, b.duration_seconds) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}
