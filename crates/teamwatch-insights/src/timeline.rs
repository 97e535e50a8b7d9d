//! Task status-change history, built by diffing successive task snapshots.
//!
//! Task files carry no change timestamps, so the tracker remembers the last
//! status it saw for every task and records an event whenever a poll finds a
//! different one. The first time a task is seen it is recorded with an empty
//! `old_status`.
//!
//! The tracker is owned by the caller and lives as long as the process that
//! polls; nothing is persisted.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use teamwatch_core::config::DEFAULT_TIMELINE_MAX_EVENTS;
use teamwatch_core::{Task, Timestamp};
use tracing::debug;

use crate::thresholds::age_seconds;

/// Default number of events returned by [`TimelineTracker::events`].
pub const DEFAULT_EVENT_LIMIT: usize = 50;

/// One observed task status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub timestamp: Timestamp,
    pub team_name: String,
    pub task_id: String,
    pub task_subject: String,
    /// Empty on first observation
    pub old_status: String,
    pub new_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl TimelineEvent {
    /// True when the task was seen for the first time rather than changing.
    pub fn is_first_observation(&self) -> bool {
        self.old_status.is_empty()
    }
}

/// Bounded in-memory log of task status changes across teams.
#[derive(Debug)]
pub struct TimelineTracker {
    previous: HashMap<String, HashMap<String, String>>,
    events: VecDeque<TimelineEvent>,
    max_events: usize,
}

impl Default for TimelineTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TIMELINE_MAX_EVENTS)
    }
}

impl TimelineTracker {
    /// Create a tracker keeping at most `max_events` events (at least one).
    pub fn new(max_events: usize) -> Self {
        Self {
            previous: HashMap::new(),
            events: VecDeque::new(),
            max_events: max_events.max(1),
        }
    }

    /// Diff `tasks` against the previous poll of `team` and record changes.
    ///
    /// Returns the events recorded by this poll. Once the log is full the
    /// oldest events are dropped.
    pub fn poll(&mut self, team: &str, tasks: &[Task], now: Timestamp) -> Vec<TimelineEvent> {
        let previous = self.previous.remove(team).unwrap_or_default();
        let mut new_events = Vec::new();

        for task in tasks {
            let old_status = previous.get(&task.id).map(String::as_str).unwrap_or("");
            if old_status == task.status.as_str() {
                continue;
            }
            new_events.push(TimelineEvent {
                timestamp: now,
                team_name: team.to_string(),
                task_id: task.id.clone(),
                task_subject: task.subject.clone(),
                old_status: old_status.to_string(),
                new_status: task.status.to_string(),
                owner: task.owner.clone(),
            });
        }

        self.events.extend(new_events.iter().cloned());
        while self.events.len() > self.max_events {
            self.events.pop_front();
        }

        let current = tasks
            .iter()
            .map(|t| (t.id.clone(), t.status.to_string()))
            .collect();
        self.previous.insert(team.to_string(), current);

        if !new_events.is_empty() {
            debug!(team, changes = new_events.len(), "task status changes recorded");
        }
        new_events
    }

    /// Up to `limit` events for `team`, newest first.
    pub fn events(&self, team: &str, limit: usize) -> Vec<TimelineEvent> {
        let mut team_events: Vec<TimelineEvent> = self
            .events
            .iter()
            .rev()
            .filter(|e| e.team_name == team)
            .cloned()
            .collect();
        team_events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        team_events.truncate(limit);
        team_events
    }

    /// Seconds since the last recorded status change of a task.
    pub fn status_duration(&self, team: &str, task_id: &str, now: Timestamp) -> Option<u64> {
        self.events
            .iter()
            .filter(|e| e.team_name == team && e.task_id == task_id)
            .map(|e| e.timestamp)
            .max()
            .map(|ts| age_seconds(ts, now))
    }

    /// Time of the latest real status change on a task owned by `agent`.
    ///
    /// First observations are not activity: they only mean the tracker
    /// started watching.
    pub fn last_activity_for(&self, team: &str, agent: &str) -> Option<Timestamp> {
        self.events
            .iter()
            .filter(|e| {
                e.team_name == team
                    && e.owner.as_deref() == Some(agent)
                    && !e.is_first_observation()
            })
            .map(|e| e.timestamp)
            .max()
    }

    /// Fill `status_duration_seconds` on each task from recorded events.
    pub fn attach_status_durations(&self, team: &str, tasks: &mut [Task], now: Timestamp) {
        for task in tasks.iter_mut() {
            task.status_duration_seconds = self.status_duration(team, &task.id, now);
        }
    }

    /// Forget one team's history, or everything when `team` is None.
    pub fn clear(&mut self, team: Option<&str>) {
        match team {
            Some(team) => {
                self.events.retain(|e| e.team_name != team);
                self.previous.remove(team);
            }
            None => {
                self.events.clear();
                self.previous.clear();
            }
        }
    }

    /// Number of retained events across all teams.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
