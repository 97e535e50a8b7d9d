//! Shared duration and classification rules.
//!
//! Both the action queue and the health score use these so a task counted
//! as blocked in one view is counted as blocked in the other.

use std::collections::HashSet;

use teamwatch_core::{Task, Timestamp};

use crate::types::RiskLevel;

/// Age at which a pending permission becomes critical.
pub const PERMISSION_CRITICAL_SECONDS: u64 = 120;

/// A stalled agent is critical once idle longer than this multiple of the
/// stall threshold.
pub const STALL_CRITICAL_MULTIPLIER: u64 = 2;

const LOW_RISK_TOOLS: [&str; 5] = ["Read", "Glob", "Grep", "WebSearch", "WebFetch"];
const MEDIUM_RISK_TOOLS: [&str; 4] = ["Bash", "Write", "Edit", "NotebookEdit"];

/// Whole seconds between `since` and `now`, zero if `since` is in the future.
pub fn age_seconds(since: Timestamp, now: Timestamp) -> u64 {
    u64::try_from((now - since).num_seconds()).unwrap_or(0)
}

/// Risk badge for a tool. Unknown tools get none.
pub fn tool_risk_level(tool_name: &str) -> Option<RiskLevel> {
    if LOW_RISK_TOOLS.contains(&tool_name) {
        Some(RiskLevel::Low)
    } else if MEDIUM_RISK_TOOLS.contains(&tool_name) {
        Some(RiskLevel::Medium)
    } else {
        None
    }
}

/// Ids of completed tasks.
pub fn completed_ids(tasks: &[Task]) -> HashSet<&str> {
    tasks
        .iter()
        .filter(|t| t.is_completed())
        .map(|t| t.id.as_str())
        .collect()
}

/// Blocker ids of `task` that are not completed. Ids that match no task
/// count as blocking.
pub fn open_blockers<'a>(task: &'a Task, completed: &HashSet<&str>) -> Vec<&'a str> {
    task.blocked_by
        .iter()
        .map(String::as_str)
        .filter(|id| !completed.contains(id))
        .collect()
}

/// A task is blocked when it is not completed and has an open blocker.
pub fn is_task_blocked(task: &Task, completed: &HashSet<&str>) -> bool {
    !task.is_completed() && !open_blockers(task, completed).is_empty()
}

/// Number of blocked tasks in a list.
pub fn blocked_count(tasks: &[Task]) -> usize {
    let completed = completed_ids(tasks);
    tasks
        .iter()
        .filter(|t| is_task_blocked(t, &completed))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use teamwatch_core::TaskStatus;

    #[test]
    fn test_age_seconds() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(age_seconds(now - Duration::seconds(90), now), 90);
        assert_eq!(age_seconds(now + Duration::seconds(5), now), 0);
    }

    #[test]
    fn test_tool_risk_level() {
        assert_eq!(tool_risk_level("Read"), Some(RiskLevel::Low));
        assert_eq!(tool_risk_level("WebFetch"), Some(RiskLevel::Low));
        assert_eq!(tool_risk_level("Bash"), Some(RiskLevel::Medium));
        assert_eq!(tool_risk_level("NotebookEdit"), Some(RiskLevel::Medium));
        assert_eq!(tool_risk_level("mcp__deploy"), None);
        assert_eq!(tool_risk_level("read"), None);
    }

    #[test]
    fn test_completed_blocker_does_not_block() {
        let tasks = vec![
            Task::new("1", "setup", TaskStatus::Completed),
            Task::new("2", "build", TaskStatus::Pending).with_blocked_by(["1"]),
        ];
        let completed = completed_ids(&tasks);
        assert!(!is_task_blocked(&tasks[1], &completed));
        assert_eq!(blocked_count(&tasks), 0);
    }

    #[test]
    fn test_missing_blocker_blocks() {
        let tasks = vec![Task::new("2", "build", TaskStatus::Pending).with_blocked_by(["99"])];
        assert_eq!(blocked_count(&tasks), 1);
    }

    #[test]
    fn test_completed_task_never_blocked() {
        let tasks = vec![
            Task::new("1", "setup", TaskStatus::InProgress),
            Task::new("2", "build", TaskStatus::Completed).with_blocked_by(["1"]),
        ];
        assert_eq!(blocked_count(&tasks), 0);
    }

    #[test]
    fn test_open_blockers_lists_only_unfinished() {
        let tasks = vec![
            Task::new("1", "a", TaskStatus::Completed),
            Task::new("2", "b", TaskStatus::InProgress),
            Task::new("3", "c", TaskStatus::Pending).with_blocked_by(["1", "2", "7"]),
        ];
        let completed = completed_ids(&tasks);
        assert_eq!(open_blockers(&tasks[2], &completed), vec!["2", "7"]);
    }
}
