//! Per-agent lifecycle lanes for a swim-lane view.
//!
//! Each member gets one lane holding a `joined` event, the messages they
//! sent or received, the task starts and completions the timeline recorded
//! for tasks they own, and any shutdown request aimed at them.

use chrono::DateTime;
use serde::Serialize;
use teamwatch_core::{InboxMessage, MessagePayload, TeamConfig, TeamMember, Timestamp};

use crate::timeline::TimelineEvent;

/// What happened at a point on an agent's lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventKind {
    Joined,
    MessageSent,
    MessageReceived,
    TaskStarted,
    TaskCompleted,
    ShutdownRequested,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    pub timestamp: Timestamp,
    pub event_type: LifecycleEventKind,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_agent: Option<String>,
}

/// One member's lane, events oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentLane {
    pub name: String,
    pub agent_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub joined_at: Timestamp,
    /// Time of the latest shutdown request targeting this agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutdown_at: Option<Timestamp>,
    pub events: Vec<LifecycleEvent>,
}

/// All lanes of a team, ordered by join time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTimeline {
    pub team_name: String,
    pub created_at: Timestamp,
    pub agents: Vec<AgentLane>,
}

/// Build lanes for every member of `config`.
///
/// `messages` are the team's merged inbox messages and `task_events` the
/// status changes recorded for the team, in any order.
pub fn build_agent_timeline(
    config: &TeamConfig,
    messages: &[InboxMessage],
    task_events: &[TimelineEvent],
) -> AgentTimeline {
    let mut agents: Vec<AgentLane> = config
        .members
        .iter()
        .map(|member| build_lane(member, messages, task_events))
        .collect();
    agents.sort_by_key(|lane| lane.joined_at);

    AgentTimeline {
        team_name: config.name.clone(),
        created_at: from_millis(config.created_at),
        agents,
    }
}

fn build_lane(member: &TeamMember, messages: &[InboxMessage], task_events: &[TimelineEvent]) -> AgentLane {
    let name = member.name.as_str();
    let joined_at = from_millis(member.joined_at);

    let mut events = vec![LifecycleEvent {
        timestamp: joined_at,
        event_type: LifecycleEventKind::Joined,
        description: "Joined team".to_string(),
        related_agent: None,
    }];

    for msg in messages {
        if msg.from_agent == name {
            events.push(LifecycleEvent {
                timestamp: msg.timestamp,
                event_type: LifecycleEventKind::MessageSent,
                description: sent_description(msg),
                related_agent: Some(msg.target_agent.clone()),
            });
        } else if msg.target_agent == name {
            events.push(LifecycleEvent {
                timestamp: msg.timestamp,
                event_type: LifecycleEventKind::MessageReceived,
                description: received_description(msg),
                related_agent: Some(msg.from_agent.clone()),
            });
        }
    }

    for te in task_events.iter().filter(|e| e.owner.as_deref() == Some(name)) {
        let (event_type, verb) = match te.new_status.as_str() {
            "in_progress" => (LifecycleEventKind::TaskStarted, "Started"),
            "completed" => (LifecycleEventKind::TaskCompleted, "Completed"),
            _ => continue,
        };
        events.push(LifecycleEvent {
            timestamp: te.timestamp,
            event_type,
            description: format!("{} task #{} ({})", verb, te.task_id, te.task_subject),
            related_agent: None,
        });
    }

    let mut shutdown_at = None;
    for msg in messages
        .iter()
        .filter(|m| m.payload == MessagePayload::ShutdownRequest && m.target_agent == name)
    {
        shutdown_at = Some(msg.timestamp);
        events.push(LifecycleEvent {
            timestamp: msg.timestamp,
            event_type: LifecycleEventKind::ShutdownRequested,
            description: format!("Shutdown requested by {}", msg.from_agent),
            related_agent: Some(msg.from_agent.clone()),
        });
    }

    events.sort_by_key(|e| e.timestamp);

    AgentLane {
        name: member.name.clone(),
        agent_type: member.agent_type.clone(),
        color: member.color.clone(),
        joined_at,
        shutdown_at,
        events,
    }
}

fn sent_description(msg: &InboxMessage) -> String {
    match &msg.payload {
        MessagePayload::PermissionRequest(body) => {
            format!("Sent permission request for {}", tool_or_unknown(&body.tool_name))
        }
        MessagePayload::ShutdownRequest => "Sent shutdown request".to_string(),
        _ => format!("Sent message to {}", msg.target_agent),
    }
}

fn received_description(msg: &InboxMessage) -> String {
    match &msg.payload {
        MessagePayload::PermissionRequest(body) => {
            format!("Received permission request for {}", tool_or_unknown(&body.tool_name))
        }
        _ => format!("Received message from {}", msg.from_agent),
    }
}

fn tool_or_unknown(tool: &str) -> &str {
    if tool.is_empty() { "unknown" } else { tool }
}

/// Unix milliseconds to a timestamp; out-of-range values become the epoch.
fn from_millis(ms: i64) -> Timestamp {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
