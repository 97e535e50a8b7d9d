//! Per-team snapshot assembly.
//!
//! [`TeamMonitor`] reads one team's files, feeds the task list through the
//! timeline, and runs the derived-state computations over the result so
//! every view in a snapshot reflects the same instant.
//!
//! ## Example
//!
//! ```no_run
//! use teamwatch_core::MonitorConfig;
//! use teamwatch_insights::TeamMonitor;
//!
//! fn main() -> teamwatch_core::Result<()> {
//!     let mut monitor = TeamMonitor::new(MonitorConfig::load(None)?);
//!
//!     if let Some(snapshot) = monitor.snapshot("alpha", chrono::Utc::now())? {
//!         println!("health {} ({:?})", snapshot.health.overall, snapshot.health.color);
//!         for item in &snapshot.action_queue {
//!             println!("[{:?}] {}", item.priority, item.title);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use teamwatch_core::{
    InboxMessage, MonitorConfig, Result, Task, TaskCounts, TeamConfig, TeamFileReader,
    TeamwatchError, Timestamp, log_team_event, validate_identifier,
};
use tracing::{debug, warn};

use crate::action_queue::build_action_queue;
use crate::agent_timeline::{AgentTimeline, build_agent_timeline};
use crate::activity::compute_agent_activity;
use crate::health_score::compute_health_score;
use crate::messages::{MessageGroup, group_by_pair, pending_permissions, unresolved_messages};
use crate::timeline::{TimelineEvent, TimelineTracker};
use crate::types::{
    ActionQueueItem, AgentActivity, HealthColor, HealthScoreBreakdown, PendingPermission,
};

/// Task status changes fed into an agent timeline.
pub const AGENT_TIMELINE_TASK_EVENTS: usize = 500;

/// Everything the detail view needs for one team at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSnapshot {
    pub team: TeamConfig,
    pub counts: TaskCounts,
    pub total_tasks: u32,
    /// Tasks with status durations attached
    pub tasks: Vec<Task>,
    pub pending_permissions: Vec<PendingPermission>,
    pub stalled_agents: Vec<String>,
    pub activity: Vec<AgentActivity>,
    pub action_queue: Vec<ActionQueueItem>,
    pub health: HealthScoreBreakdown,
    pub stall_threshold_minutes: u64,
    pub has_unread_messages: bool,
}

/// One row of the team list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub name: String,
    pub description: String,
    /// Unix milliseconds
    pub created_at: i64,
    pub member_count: usize,
    pub counts: TaskCounts,
    pub total_tasks: usize,
    pub has_unread_messages: bool,
    pub health_overall: u8,
    pub health_color: HealthColor,
}

impl From<&TeamSnapshot> for TeamSummary {
    fn from(snapshot: &TeamSnapshot) -> Self {
        Self {
            name: snapshot.team.name.clone(),
            description: snapshot.team.description.clone(),
            created_at: snapshot.team.created_at,
            member_count: snapshot.team.members.len(),
            counts: snapshot.counts,
            total_tasks: snapshot.tasks.len(),
            has_unread_messages: snapshot.has_unread_messages,
            health_overall: snapshot.health.overall,
            health_color: snapshot.health.color,
        }
    }
}

/// Message feed options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageQuery {
    /// Only requests still waiting on a response
    pub unresolved: bool,
    /// Group by unordered agent pair
    pub group_by_pair: bool,
}

/// Result of a message feed query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MessageView {
    #[serde(rename = "messages")]
    Flat(Vec<InboxMessage>),
    #[serde(rename = "groups")]
    Grouped(Vec<MessageGroup>),
}

impl MessageView {
    /// Total messages in the view.
    pub fn message_count(&self) -> usize {
        match self {
            Self::Flat(messages) => messages.len(),
            Self::Grouped(groups) => groups.iter().map(|g| g.message_count).sum(),
        }
    }
}

/// Reads team files and derives dashboard state.
///
/// Holds the timeline, so one monitor should be reused across polls.
#[derive(Debug)]
pub struct TeamMonitor {
    reader: TeamFileReader,
    timeline: TimelineTracker,
    config: MonitorConfig,
}

impl TeamMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self::with_reader(TeamFileReader::from_config(&config), config)
    }

    /// Use an explicit reader, e.g. over fixture directories.
    pub fn with_reader(reader: TeamFileReader, config: MonitorConfig) -> Self {
        Self {
            reader,
            timeline: TimelineTracker::new(config.timeline_max_events),
            config,
        }
    }

    pub fn reader(&self) -> &TeamFileReader {
        &self.reader
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn list_teams(&self) -> Result<Vec<String>> {
        self.reader.list_teams()
    }

    /// Build a snapshot of `team`, polling the timeline on the way.
    ///
    /// Returns `None` when the team has no readable config.
    pub fn snapshot(&mut self, team: &str, now: Timestamp) -> Result<Option<TeamSnapshot>> {
        validate_identifier(team, "team name")?;

        let Some(config) = self.reader.team_config(team)? else {
            debug!(team, "no config, skipping snapshot");
            return Ok(None);
        };

        let mut tasks = self.reader.tasks(team)?;
        self.timeline.poll(team, &tasks, now);
        self.timeline.attach_status_durations(team, &mut tasks, now);

        let messages = self.reader.all_messages(team)?;
        let activity = compute_agent_activity(
            team,
            &config,
            &tasks,
            &messages,
            &self.timeline,
            self.config.stall_threshold_minutes,
            now,
        );
        let pending = pending_permissions(&messages);
        let counts = TaskCounts::from_tasks(&tasks);
        let has_unread_messages = messages.iter().any(|m| !m.read);

        let action_queue = build_action_queue(
            &pending,
            &activity,
            &tasks,
            self.config.stall_threshold_seconds(),
            now,
        );
        let health = compute_health_score(&pending, &activity, &tasks, counts, now);

        let stalled_agents = activity
            .iter()
            .filter(|a| a.is_stalled)
            .map(|a| a.agent_name.clone())
            .collect();

        log_team_event!(
            team,
            "snapshot",
            health = health.overall,
            queue = action_queue.len(),
            pending = pending.len()
        );

        Ok(Some(TeamSnapshot {
            team: config,
            total_tasks: counts.total(),
            counts,
            tasks,
            pending_permissions: pending,
            stalled_agents,
            activity,
            action_queue,
            health,
            stall_threshold_minutes: self.config.stall_threshold_minutes,
            has_unread_messages,
        }))
    }

    /// Like [`snapshot`](Self::snapshot), but a missing team is an error.
    pub fn require_snapshot(&mut self, team: &str, now: Timestamp) -> Result<TeamSnapshot> {
        self.snapshot(team, now)?
            .ok_or_else(|| TeamwatchError::TeamNotFound {
                team: team.to_string(),
            })
    }

    /// List rows for every team with a readable config, sorted by name.
    ///
    /// Each row comes from a full snapshot, so this also polls the timeline.
    /// Teams whose files cannot be read are skipped with a warning.
    pub fn summaries(&mut self, now: Timestamp) -> Result<Vec<TeamSummary>> {
        let mut summaries = Vec::new();

        for team in self.reader.list_teams()? {
            if validate_identifier(&team, "team name").is_err() {
                debug!(team = %team, "skipping team with unusable name");
                continue;
            }
            match self.snapshot(&team, now) {
                Ok(Some(snapshot)) => summaries.push(TeamSummary::from(&snapshot)),
                Ok(None) => {}
                Err(e) => warn!(team = %team, "skipping team: {}", e),
            }
        }

        Ok(summaries)
    }

    /// A team's messages, oldest first, filtered and grouped per `query`.
    pub fn messages(&self, team: &str, query: MessageQuery) -> Result<MessageView> {
        validate_identifier(team, "team name")?;

        let mut messages = self.reader.all_messages(team)?;
        if query.unresolved {
            messages = unresolved_messages(&messages);
        }

        Ok(if query.group_by_pair {
            MessageView::Grouped(group_by_pair(&messages))
        } else {
            MessageView::Flat(messages)
        })
    }

    /// Lifecycle lanes for every member of `team`.
    ///
    /// Polls the timeline first so a fresh monitor still reports the task
    /// states it can see. Returns `None` when the team has no readable config.
    pub fn agent_timeline(&mut self, team: &str, now: Timestamp) -> Result<Option<AgentTimeline>> {
        validate_identifier(team, "team name")?;

        let Some(config) = self.reader.team_config(team)? else {
            return Ok(None);
        };

        let tasks = self.reader.tasks(team)?;
        self.timeline.poll(team, &tasks, now);

        let messages = self.reader.all_messages(team)?;
        let task_events = self.timeline.events(team, AGENT_TIMELINE_TASK_EVENTS);
        Ok(Some(build_agent_timeline(&config, &messages, &task_events)))
    }

    /// Up to `limit` recorded status changes for `team`, newest first.
    pub fn timeline(&self, team: &str, limit: usize) -> Result<Vec<TimelineEvent>> {
        validate_identifier(team, "team name")?;
        Ok(self.timeline.events(team, limit))
    }

    /// Forget recorded status history for one team or all teams.
    pub fn reset_timeline(&mut self, team: Option<&str>) {
        self.timeline.clear(team);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AgentStatus;
    use chrono::{Duration, TimeZone, Utc};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn write(path: impl AsRef<Path>, content: &str) {
        let path = path.as_ref();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn monitor(root: &Path) -> TeamMonitor {
        let config = MonitorConfig::default().with_claude_home(root);
        TeamMonitor::new(config)
    }

    fn seed(root: &Path) {
        write(
            root.join("teams/alpha/config.json"),
            r#"{"name":"alpha","members":[
                {"agentId":"a1","name":"lead","agentType":"team-lead"},
                {"agentId":"a2","name":"dev","agentType":"general-purpose","color":"green"}],
                "leadAgentId":"a1"}"#,
        );
        write(
            root.join("tasks/alpha/1.json"),
            r#"{"id":"1","subject":"Build","status":"in_progress","owner":"dev"}"#,
        );
        write(
            root.join("tasks/alpha/2.json"),
            r#"{"id":"2","subject":"Ship","status":"pending","owner":"dev","blockedBy":["1"]}"#,
        );
        write(
            root.join("teams/alpha/inboxes/lead.json"),
            r#"[{"from":"dev","timestamp":"2026-03-01T11:59:00Z","color":"green",
                 "text":"{\"type\":\"permission_request\",\"request_id\":\"r1\",\"tool_use_id\":\"t1\",\"tool_name\":\"Bash\",\"description\":\"cargo build\"}"}]"#,
        );
    }

    #[test]
    fn test_snapshot_assembles_views() {
        let tmp = TempDir::new().unwrap();
        seed(tmp.path());
        let mut monitor = monitor(tmp.path());

        let snapshot = monitor.snapshot("alpha", t0()).unwrap().unwrap();
        assert_eq!(snapshot.team.name, "alpha");
        assert_eq!(snapshot.total_tasks, 2);
        assert_eq!(snapshot.pending_permissions.len(), 1);
        assert_eq!(snapshot.activity.len(), 2);
        assert_eq!(snapshot.stall_threshold_minutes, 10);
        assert!(snapshot.stalled_agents.is_empty());

        let ids: Vec<&str> = snapshot.action_queue.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["perm:r1", "blocked:2"]);
        assert_eq!(snapshot.tasks[0].status_duration_seconds, Some(0));
    }

    #[test]
    fn test_snapshot_missing_team() {
        let tmp = TempDir::new().unwrap();
        let mut monitor = monitor(tmp.path());
        assert!(monitor.snapshot("ghost", t0()).unwrap().is_none());
        assert!(matches!(
            monitor.require_snapshot("ghost", t0()),
            Err(TeamwatchError::TeamNotFound { .. })
        ));
    }

    #[test]
    fn test_snapshot_rejects_bad_identifier() {
        let tmp = TempDir::new().unwrap();
        let mut monitor = monitor(tmp.path());
        assert!(matches!(
            monitor.snapshot("../alpha", t0()),
            Err(TeamwatchError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_repeated_snapshots_track_durations_and_stalls() {
        let tmp = TempDir::new().unwrap();
        seed(tmp.path());
        let mut monitor = monitor(tmp.path());

        monitor.snapshot("alpha", t0()).unwrap();
        let later = t0() + Duration::minutes(30);
        let snapshot = monitor.snapshot("alpha", later).unwrap().unwrap();

        assert_eq!(snapshot.tasks[0].status_duration_seconds, Some(1800));
        let dev = snapshot
            .activity
            .iter()
            .find(|a| a.agent_name == "dev")
            .unwrap();
        assert_eq!(dev.status, AgentStatus::Stalled);
        assert_eq!(snapshot.stalled_agents, vec!["dev"]);
        assert!(
            snapshot
                .action_queue
                .iter()
                .any(|i| i.id == "stall:dev")
        );
    }

    #[test]
    fn test_summaries() {
        let tmp = TempDir::new().unwrap();
        seed(tmp.path());
        fs::create_dir_all(tmp.path().join("teams/no-config")).unwrap();
        let mut monitor = monitor(tmp.path());

        let summaries = monitor.summaries(t0()).unwrap();
        assert_eq!(summaries.len(), 1);
        let alpha = &summaries[0];
        assert_eq!(alpha.member_count, 2);
        assert_eq!(alpha.total_tasks, 2);
        assert!(alpha.has_unread_messages);

        let snapshot = monitor.snapshot("alpha", t0()).unwrap().unwrap();
        assert_eq!(*alpha, TeamSummary::from(&snapshot));
    }

    #[test]
    fn test_summaries_skip_unreadable_team() {
        let tmp = TempDir::new().unwrap();
        seed(tmp.path());
        write(tmp.path().join("teams/beta/config.json"), r#"{"name":"beta"}"#);
        // a plain file where the task directory should be
        write(tmp.path().join("tasks/beta"), "");
        let mut monitor = monitor(tmp.path());

        assert!(monitor.snapshot("beta", t0()).is_err());
        let names: Vec<String> = monitor
            .summaries(t0())
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["alpha"]);
    }

    #[test]
    fn test_messages_views() {
        let tmp = TempDir::new().unwrap();
        seed(tmp.path());
        write(
            tmp.path().join("teams/alpha/inboxes/dev.json"),
            r#"[{"from":"lead","text":"how is it going","timestamp":"2026-03-01T11:58:00Z"}]"#,
        );
        let monitor = monitor(tmp.path());

        let all = monitor.messages("alpha", MessageQuery::default()).unwrap();
        assert_eq!(all.message_count(), 2);

        let unresolved = monitor
            .messages(
                "alpha",
                MessageQuery {
                    unresolved: true,
                    group_by_pair: false,
                },
            )
            .unwrap();
        match unresolved {
            MessageView::Flat(messages) => {
                assert_eq!(messages.len(), 1);
                assert_eq!(messages[0].message_type(), "permission_request");
            }
            other => panic!("Unexpected view: {:?}", other),
        }

        let grouped = monitor
            .messages(
                "alpha",
                MessageQuery {
                    unresolved: false,
                    group_by_pair: true,
                },
            )
            .unwrap();
        match grouped {
            MessageView::Grouped(groups) => {
                assert_eq!(groups.len(), 1);
                assert_eq!(groups[0].message_count, 2);
            }
            other => panic!("Unexpected view: {:?}", other),
        }
    }

    #[test]
    fn test_timeline_after_snapshot() {
        let tmp = TempDir::new().unwrap();
        seed(tmp.path());
        let mut monitor = monitor(tmp.path());

        assert!(monitor.timeline("alpha", 10).unwrap().is_empty());
        monitor.snapshot("alpha", t0()).unwrap();
        assert_eq!(monitor.timeline("alpha", 10).unwrap().len(), 2);

        monitor.reset_timeline(Some("alpha"));
        assert!(monitor.timeline("alpha", 10).unwrap().is_empty());
    }

    #[test]
    fn test_agent_timeline_reads_team() {
        let tmp = TempDir::new().unwrap();
        seed(tmp.path());
        let mut monitor = monitor(tmp.path());

        let timeline = monitor.agent_timeline("alpha", t0()).unwrap().unwrap();
        assert_eq!(timeline.team_name, "alpha");
        assert_eq!(timeline.agents.len(), 2);

        let dev = timeline.agents.iter().find(|a| a.name == "dev").unwrap();
        let descriptions: Vec<&str> = dev.events.iter().map(|e| e.description.as_str()).collect();
        assert!(descriptions.contains(&"Sent permission request for Bash"));
        assert!(descriptions.contains(&"Started task #1 (Build)"));

        assert!(monitor.agent_timeline("ghost", t0()).unwrap().is_none());
    }

    #[test]
    fn test_message_view_serializes_tagged() {
        let view = MessageView::Grouped(Vec::new());
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("groups").is_some());
    }
}
