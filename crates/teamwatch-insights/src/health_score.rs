//! 0-100 team health score from four weighted dimensions.
//!
//! | Dimension            | Weight | Score                                          |
//! |----------------------|--------|------------------------------------------------|
//! | `permission_latency` | 0.30   | 100 minus (25 + wait minutes) per permission   |
//! | `stall_ratio`        | 0.25   | share of agents not stalled                    |
//! | `blocked_ratio`      | 0.25   | share of tasks not blocked                     |
//! | `throughput`         | 0.20   | share of tasks completed                       |
//!
//! Empty inputs score 100 on their dimension. The overall score is the
//! weighted sum of the rounded dimension scores. Halves round to even.

use teamwatch_core::{Task, TaskCounts, Timestamp};

use crate::thresholds::{age_seconds, blocked_count};
use crate::types::{
    AgentActivity, AgentStatus, DimensionScore, HealthColor, HealthScoreBreakdown,
    PendingPermission,
};

pub const PERMISSION_LATENCY_WEIGHT: f64 = 0.30;
pub const STALL_RATIO_WEIGHT: f64 = 0.25;
pub const BLOCKED_RATIO_WEIGHT: f64 = 0.25;
pub const THROUGHPUT_WEIGHT: f64 = 0.20;

/// Base penalty for each pending permission.
const PERMISSION_PENALTY: f64 = 25.0;

/// Lowest score in the green band.
pub const GREEN_MIN: u8 = 80;
/// Lowest score in the amber band.
pub const AMBER_MIN: u8 = 50;

/// Compute the health breakdown for one consistent team snapshot.
///
/// `counts` supplies the task totals; `tasks` is only used to find blocked
/// tasks.
pub fn compute_health_score(
    pending_permissions: &[PendingPermission],
    activity: &[AgentActivity],
    tasks: &[Task],
    counts: TaskCounts,
    now: Timestamp,
) -> HealthScoreBreakdown {
    let dimensions = vec![
        score_permission_latency(pending_permissions, now),
        score_stall_ratio(activity),
        score_blocked_ratio(tasks, counts),
        score_throughput(counts),
    ];

    let weighted: f64 = dimensions
        .iter()
        .map(|d| f64::from(d.score) * d.weight)
        .sum();
    let overall = to_score(weighted);
    let color = health_color(overall);

    HealthScoreBreakdown {
        overall,
        color,
        label: color.label().to_string(),
        dimensions,
    }
}

/// Band for an overall score. Lower bounds are inclusive.
pub fn health_color(overall: u8) -> HealthColor {
    if overall >= GREEN_MIN {
        HealthColor::Green
    } else if overall >= AMBER_MIN {
        HealthColor::Amber
    } else {
        HealthColor::Red
    }
}

fn score_permission_latency(perms: &[PendingPermission], now: Timestamp) -> DimensionScore {
    if perms.is_empty() {
        return dimension(
            "permission_latency",
            100.0,
            PERMISSION_LATENCY_WEIGHT,
            "No pending permissions".to_string(),
        );
    }

    let ages: Vec<u64> = perms.iter().map(|p| age_seconds(p.created_at, now)).collect();
    let penalty: f64 = ages
        .iter()
        .map(|&age| PERMISSION_PENALTY + age as f64 / 60.0)
        .sum();
    let oldest_minutes = ages.iter().max().copied().unwrap_or(0) / 60;

    dimension(
        "permission_latency",
        100.0 - penalty,
        PERMISSION_LATENCY_WEIGHT,
        format!(
            "{} pending permission{}, oldest waiting {}m",
            perms.len(),
            plural(perms.len()),
            oldest_minutes
        ),
    )
}

fn score_stall_ratio(activity: &[AgentActivity]) -> DimensionScore {
    let total = activity.len();
    if total == 0 {
        return dimension("stall_ratio", 100.0, STALL_RATIO_WEIGHT, "No agents".to_string());
    }

    let stalled = activity
        .iter()
        .filter(|a| a.status == AgentStatus::Stalled)
        .count();

    dimension(
        "stall_ratio",
        100.0 * (1.0 - stalled as f64 / total as f64),
        STALL_RATIO_WEIGHT,
        format!("{} of {} agent{} stalled", stalled, total, plural(total)),
    )
}

fn score_blocked_ratio(tasks: &[Task], counts: TaskCounts) -> DimensionScore {
    let total = counts.total() as usize;
    if total == 0 {
        return dimension("blocked_ratio", 100.0, BLOCKED_RATIO_WEIGHT, "No tasks".to_string());
    }

    let blocked = blocked_count(tasks);

    dimension(
        "blocked_ratio",
        100.0 * (1.0 - blocked as f64 / total as f64),
        BLOCKED_RATIO_WEIGHT,
        format!("{} of {} task{} blocked", blocked, total, plural(total)),
    )
}

fn score_throughput(counts: TaskCounts) -> DimensionScore {
    let total = counts.total() as usize;
    if total == 0 {
        return dimension("throughput", 100.0, THROUGHPUT_WEIGHT, "No tasks".to_string());
    }

    dimension(
        "throughput",
        100.0 * f64::from(counts.completed) / total as f64,
        THROUGHPUT_WEIGHT,
        format!("{} of {} task{} completed", counts.completed, total, plural(total)),
    )
}

fn dimension(name: &str, raw: f64, weight: f64, explanation: String) -> DimensionScore {
    DimensionScore {
        name: name.to_string(),
        score: to_score(raw),
        weight,
        explanation,
    }
}

/// Clamp to 0..=100 and round to the nearest integer, ties to even.
fn to_score(raw: f64) -> u8 {
    raw.clamp(0.0, 100.0).round_ties_even() as u8
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use teamwatch_core::TaskStatus;

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn perm(id: &str, age_secs: i64) -> PendingPermission {
        PendingPermission {
            request_id: id.to_string(),
            tool_use_id: String::new(),
            tool_name: "Bash".to_string(),
            agent_name: "dev".to_string(),
            agent_color: None,
            description: String::new(),
            created_at: now() - Duration::seconds(age_secs),
        }
    }

    fn dim<'a>(breakdown: &'a HealthScoreBreakdown, name: &str) -> &'a DimensionScore {
        breakdown
            .dimensions
            .iter()
            .find(|d| d.name == name)
            .unwrap()
    }

    #[test]
    fn test_empty_team_is_healthy() {
        let health = compute_health_score(&[], &[], &[], TaskCounts::default(), now());
        assert_eq!(health.overall, 100);
        assert_eq!(health.color, HealthColor::Green);
        assert_eq!(health.label, "Healthy");
        assert_eq!(dim(&health, "stall_ratio").explanation, "No agents");
        assert_eq!(dim(&health, "throughput").explanation, "No tasks");
    }

    #[test]
    fn test_weights_sum_to_one() {
        let health = compute_health_score(&[], &[], &[], TaskCounts::default(), now());
        let total: f64 = health.dimensions.iter().map(|d| d.weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
        let names: Vec<&str> = health.dimensions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["permission_latency", "stall_ratio", "blocked_ratio", "throughput"]
        );
    }

    #[test]
    fn test_worst_case_clamps_to_zero() {
        let perms = vec![perm("a", 600), perm("b", 600), perm("c", 600)];
        let activity = vec![
            AgentActivity::new("one", AgentStatus::Stalled).with_tasks(1, 0, 0),
            AgentActivity::new("two", AgentStatus::Stalled).with_tasks(0, 1, 0),
        ];
        let tasks = vec![
            Task::new("1", "a", TaskStatus::Pending).with_blocked_by(["2"]),
            Task::new("2", "b", TaskStatus::InProgress).with_blocked_by(["1"]),
        ];
        let counts = TaskCounts::from_tasks(&tasks);

        let health = compute_health_score(&perms, &activity, &tasks, counts, now());
        assert_eq!(health.overall, 0);
        assert_eq!(health.color, HealthColor::Red);
        assert_eq!(health.label, "Critical");
        assert!(health.dimensions.iter().all(|d| d.score == 0));
    }

    #[test]
    fn test_permission_latency_penalty() {
        // 100 - (25 + 3) - (25 + 1) = 46
        let health = compute_health_score(
            &[perm("a", 180), perm("b", 60)],
            &[],
            &[],
            TaskCounts::default(),
            now(),
        );
        let latency = dim(&health, "permission_latency");
        assert_eq!(latency.score, 46);
        assert_eq!(latency.explanation, "2 pending permissions, oldest waiting 3m");
    }

    #[test]
    fn test_stall_and_blocked_ratios() {
        let activity = vec![
            AgentActivity::new("one", AgentStatus::Stalled),
            AgentActivity::new("two", AgentStatus::Active),
            AgentActivity::new("three", AgentStatus::Idle),
            AgentActivity::new("four", AgentStatus::Completed),
            AgentActivity::new("five", AgentStatus::Active),
        ];
        let tasks = vec![
            Task::new("1", "a", TaskStatus::Completed),
            Task::new("2", "b", TaskStatus::Pending).with_blocked_by(["1"]),
            Task::new("3", "c", TaskStatus::Pending).with_blocked_by(["2"]),
            Task::new("4", "d", TaskStatus::InProgress),
        ];
        let counts = TaskCounts::from_tasks(&tasks);

        let health = compute_health_score(&[], &activity, &tasks, counts, now());
        assert_eq!(dim(&health, "stall_ratio").score, 80);
        assert_eq!(dim(&health, "stall_ratio").explanation, "1 of 5 agents stalled");
        assert_eq!(dim(&health, "blocked_ratio").score, 75);
        assert_eq!(dim(&health, "blocked_ratio").explanation, "1 of 4 tasks blocked");
        assert_eq!(dim(&health, "throughput").score, 25);
        assert_eq!(dim(&health, "throughput").explanation, "1 of 4 tasks completed");
        // 30 + 20 + 18.75 + 5 = 73.75
        assert_eq!(health.overall, 74);
        assert_eq!(health.color, HealthColor::Amber);
    }

    #[test]
    fn test_half_scores_round_to_even() {
        // 5 of 8 not stalled = 62.5
        let mut activity: Vec<AgentActivity> = (0..5)
            .map(|i| AgentActivity::new(format!("active-{}", i), AgentStatus::Active))
            .collect();
        activity.extend((0..3).map(|i| AgentActivity::new(format!("stalled-{}", i), AgentStatus::Stalled)));

        let health = compute_health_score(&[], &activity, &[], TaskCounts::default(), now());
        assert_eq!(dim(&health, "stall_ratio").score, 62);

        // 100 - (25 + 0.5) = 74.5
        let health = compute_health_score(&[perm("a", 30)], &[], &[], TaskCounts::default(), now());
        assert_eq!(dim(&health, "permission_latency").score, 74);
        assert_eq!(to_score(73.5), 74);
    }

    #[test]
    fn test_completed_blocker_is_not_blocked() {
        let tasks = vec![
            Task::new("1", "a", TaskStatus::Completed),
            Task::new("2", "b", TaskStatus::Pending).with_blocked_by(["1"]),
        ];
        let health = compute_health_score(&[], &[], &tasks, TaskCounts::from_tasks(&tasks), now());
        assert_eq!(dim(&health, "blocked_ratio").score, 100);
    }

    #[test]
    fn test_color_boundaries() {
        assert_eq!(health_color(100), HealthColor::Green);
        assert_eq!(health_color(80), HealthColor::Green);
        assert_eq!(health_color(79), HealthColor::Amber);
        assert_eq!(health_color(50), HealthColor::Amber);
        assert_eq!(health_color(49), HealthColor::Red);
        assert_eq!(health_color(0), HealthColor::Red);
    }

    #[test]
    fn test_deterministic() {
        let perms = vec![perm("a", 75)];
        let activity = vec![AgentActivity::new("one", AgentStatus::Active)];
        let first = compute_health_score(&perms, &activity, &[], TaskCounts::new(1, 1, 1), now());
        let second = compute_health_score(&perms, &activity, &[], TaskCounts::new(1, 1, 1), now());
        assert_eq!(first, second);
    }
}
