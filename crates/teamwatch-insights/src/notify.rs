//! Dedup for "new permission request" notifications.
//!
//! A consumer that alerts on permission requests polls the pending list
//! repeatedly. [`SeenPermissions`] remembers which request ids were already
//! reported so each request is announced once.

use std::collections::HashSet;

use crate::types::PendingPermission;

/// Request ids already announced. Owned by the caller.
#[derive(Debug, Clone, Default)]
pub struct SeenPermissions {
    seen: HashSet<String>,
}

impl SeenPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current pending list and return the requests not seen in
    /// earlier calls, in input order.
    ///
    /// Ids missing from `pending` are forgotten, so a request id that is
    /// reused after being answered is announced again.
    pub fn observe(&mut self, pending: &[PendingPermission]) -> Vec<PendingPermission> {
        let current: HashSet<String> = pending.iter().map(|p| p.request_id.clone()).collect();

        let fresh: Vec<PendingPermission> = pending
            .iter()
            .filter(|p| !self.seen.contains(&p.request_id))
            .cloned()
            .collect();

        self.seen = current;
        fresh
    }

    pub fn contains(&self, request_id: &str) -> bool {
        self.seen.contains(request_id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
