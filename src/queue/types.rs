//! Type definitions for the queue system
//!
//! Read-only snapshots and sweep reports. Nothing here holds a reference
//! into live engine state.

use serde::Serialize;
use std::collections::BTreeMap;

/// What one sweep pass over a single queue changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct QueueSweep {
    pub leases_expired: usize,
    pub groups_removed: usize,
    pub messages_culled: usize,
}

/// What one full expiration sweep changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Leases whose deadline had passed
    pub leases_expired: usize,
    /// Groups deleted because they were empty and unleased
    pub groups_removed: usize,
    /// Messages dropped for exceeding the message dead timeout
    pub messages_culled: usize,
    /// Queues deleted after sitting empty past the queue dead timeout
    pub queues_removed: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        *self == SweepReport::default()
    }

    /// Anything was thrown away rather than merely released
    pub fn culled_anything(&self) -> bool {
        self.messages_culled > 0 || self.queues_removed > 0
    }

    pub(crate) fn absorb(&mut self, queue: QueueSweep) {
        self.leases_expired += queue.leases_expired;
        self.groups_removed += queue.groups_removed;
        self.messages_culled += queue.messages_culled;
    }
}

/// Point-in-time view of one queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub queue_id: String,
    /// Messages in any backlog, delivered or not
    pub held: usize,
    /// Delivered and not yet removed
    pub pending: usize,
    pub groups: usize,
    pub owned_groups: usize,
    /// Owner → number of groups it currently leases
    pub owner_counts: BTreeMap<String, usize>,
    /// Sequence number the next send will receive
    pub next_sequence: u64,
}

/// Process-wide counters plus every queue's snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerStats {
    pub sent: u64,
    pub received: u64,
    pub removed: u64,
    /// Abandoned messages dropped by the sweep
    pub culled: u64,
    pub queues_culled: u64,
    pub queues: Vec<QueueSnapshot>,
}

impl BrokerStats {
    pub fn held(&self) -> usize {
        self.queues.iter().map(|q| q.held).sum()
    }

    pub fn queue(&self, queue_id: &str) -> Option<&QueueSnapshot> {
        self.queues.iter().find(|q| q.queue_id == queue_id)
    }
}
