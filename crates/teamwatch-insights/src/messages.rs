//! Message feed queries: pending permissions, unresolved requests, and
//! grouping by conversation pair.
//!
//! All functions take messages in chronological order, as returned by
//! [`TeamFileReader::all_messages`](teamwatch_core::TeamFileReader::all_messages),
//! and make a single pass to index responses before filtering.

use std::collections::HashMap;

use serde::Serialize;
use teamwatch_core::{InboxMessage, MessagePayload, Timestamp};

use crate::types::PendingPermission;

/// Messages exchanged between two agents, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageGroup {
    /// The two agents, sorted
    pub pair: (String, String),
    pub message_count: usize,
    /// Oldest first
    pub messages: Vec<InboxMessage>,
}

/// Permission requests that have no response with the same request id
/// anywhere in `messages`.
pub fn pending_permissions(messages: &[InboxMessage]) -> Vec<PendingPermission> {
    let responded = response_index(messages);

    messages
        .iter()
        .filter_map(|msg| match &msg.payload {
            MessagePayload::PermissionRequest(body)
                if !responded.contains_key(body.request_id.as_str()) =>
            {
                Some(PendingPermission {
                    request_id: body.request_id.clone(),
                    tool_use_id: body.tool_use_id.clone(),
                    tool_name: body.tool_name.clone(),
                    agent_name: msg.from_agent.clone(),
                    agent_color: msg.color.clone(),
                    description: body.description.clone(),
                    created_at: msg.timestamp,
                })
            }
            _ => None,
        })
        .collect()
}

/// Requests still waiting on an answer.
///
/// Keeps `permission_request` messages with no `permission_response` for the
/// same request id at or after the request's timestamp, and
/// `shutdown_request` messages whose target has not since sent a
/// `shutdown_response`. Everything else is dropped.
///
/// Timestamps only have the precision the agents write, so a response
/// stamped the same instant as its request counts as answering it.
pub fn unresolved_messages(messages: &[InboxMessage]) -> Vec<InboxMessage> {
    let last_permission_response = response_index(messages);

    let mut last_shutdown_response: HashMap<&str, Timestamp> = HashMap::new();
    for msg in messages {
        if msg.payload == MessagePayload::ShutdownResponse {
            record_latest(&mut last_shutdown_response, &msg.from_agent, msg.timestamp);
        }
    }

    messages
        .iter()
        .filter(|msg| match &msg.payload {
            MessagePayload::PermissionRequest(body) => last_permission_response
                .get(body.request_id.as_str())
                .is_none_or(|&answered| answered < msg.timestamp),
            MessagePayload::ShutdownRequest => last_shutdown_response
                .get(msg.target_agent.as_str())
                .is_none_or(|&answered| answered < msg.timestamp),
            _ => false,
        })
        .cloned()
        .collect()
}

/// Partition messages by unordered (sender, target) pair.
///
/// Groups appear in order of their first message.
pub fn group_by_pair(messages: &[InboxMessage]) -> Vec<MessageGroup> {
    let mut groups: Vec<MessageGroup> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for msg in messages {
        let key = pair_key(&msg.from_agent, &msg.target_agent);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(MessageGroup {
                pair: key,
                message_count: 0,
                messages: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.messages.push(msg.clone());
        group.message_count += 1;
    }

    groups
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Timestamp of the latest `permission_response` per request id.
fn response_index(messages: &[InboxMessage]) -> HashMap<&str, Timestamp> {
    let mut index = HashMap::new();
    for msg in messages {
        if let MessagePayload::PermissionResponse(body) = &msg.payload
            && !body.request_id.is_empty()
        {
            record_latest(&mut index, &body.request_id, msg.timestamp);
        }
    }
    index
}

fn record_latest<'a>(index: &mut HashMap<&'a str, Timestamp>, key: &'a str, at: Timestamp) {
    index
        .entry(key)
        .and_modify(|seen| *seen = (*seen).max(at))
        .or_insert(at);
}
