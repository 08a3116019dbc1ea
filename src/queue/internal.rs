//! Internal Queue implementation
//!
//! A queue is an insertion-ordered index of groups plus a per-queue sequence
//! counter. All methods take the current instant from the caller, so the
//! queue itself never reads a clock.

use crate::queue::error::{QueueError, QueueResult};
use crate::queue::group::Group;
use crate::queue::message::Message;
use crate::queue::options::{QueueOptions, QueueOptionsPatch};
use crate::queue::ordered::OrderedMap;
use crate::queue::types::{QueueSnapshot, QueueSweep};
use std::collections::BTreeMap;
use std::time::Instant;

#[derive(Debug)]
pub(crate) struct Queue {
    id: String,
    groups: OrderedMap<Group>,
    next_sequence: u64,
    options: QueueOptions,
    /// Messages currently in any backlog, pending or not
    held: usize,
    last_activity: Instant,
}

impl Queue {
    pub fn new(id: &str, options: QueueOptions, now: Instant) -> Self {
        Self {
            id: id.to_string(),
            groups: OrderedMap::new(),
            next_sequence: 1,
            options,
            held: 0,
            last_activity: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn options(&self) -> &QueueOptions {
        &self.options
    }

    pub fn held(&self) -> usize {
        self.held
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn set_options(&mut self, patch: &QueueOptionsPatch) {
        patch.apply(&mut self.options);
    }

    fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    fn take_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    /// Enqueue a message; returns how many copies were stored.
    ///
    /// A broadcast stores one derived copy per owned group and nothing when
    /// no group is owned.
    pub fn send(&mut self, mut message: Message, now: Instant) -> QueueResult<usize> {
        self.touch(now);

        if message.is_broadcast() {
            return self.broadcast(message, now);
        }

        let group_id = message.effective_group().to_string();
        message.group_id = group_id.clone();

        let duplicate = self
            .groups
            .get(&group_id)
            .is_some_and(|group| group.contains(&message.id));
        if duplicate {
            return Err(self.duplicate(&group_id, &message.id));
        }

        message.sequence_number = Some(self.take_sequence());
        let group = self
            .groups
            .get_or_insert_with(&group_id, || Group::new(&group_id));
        match group.insert(message, now) {
            Ok(()) => {
                self.held += 1;
                Ok(1)
            }
            Err(rejected) => Err(self.duplicate(&group_id, &rejected.id)),
        }
    }

    fn broadcast(&mut self, message: Message, now: Instant) -> QueueResult<usize> {
        let owned: Vec<String> = self
            .groups
            .iter()
            .filter(|(_, group)| group.is_leased())
            .map(|(id, _)| id.to_string())
            .collect();

        let mut stored = 0;
        for group_id in owned {
            let derived_id = format!("{}{}", message.id, group_id);
            let sequence = self.next_sequence;
            let Some(group) = self.groups.get_mut(&group_id) else {
                continue;
            };
            let mut copy = Message::new(derived_id, group_id.clone(), message.contents.clone());
            copy.sequence_number = Some(sequence);
            if let Err(rejected) = group.insert(copy, now) {
                return Err(self.duplicate(&group_id, &rejected.id));
            }
            self.next_sequence += 1;
            self.held += 1;
            stored += 1;
        }

        if stored == 0 {
            log::debug!(
                "Queue {}: broadcast {} dropped, no owned groups",
                self.id,
                message.id
            );
        }
        Ok(stored)
    }

    fn duplicate(&self, group_id: &str, message_id: &str) -> QueueError {
        QueueError::DuplicateMessage {
            queue_id: self.id.clone(),
            group_id: group_id.to_string(),
            message_id: message_id.to_string(),
        }
    }

    pub fn claim(&mut self, owner: &str, group_id: &str, now: Instant) -> QueueResult<()> {
        self.touch(now);
        let deadline = now + self.options.visibility_timeout;
        let group = self
            .groups
            .get_or_insert_with(group_id, || Group::new(group_id));

        group
            .claim(owner, deadline)
            .map_err(|current| QueueError::OwnershipConflict {
                queue_id: self.id.clone(),
                group_id: group_id.to_string(),
                owner: current,
                claimant: owner.to_string(),
            })
    }

    /// Collect up to `receiveLimit` messages for `owner`.
    ///
    /// Groups already leased to `owner` are drained first so that a
    /// consumer's own FIFO groups never starve behind new work. Unleased
    /// groups are then claimed one after another unless `ownerOnly` is set.
    pub fn receive(&mut self, owner: &str, now: Instant) -> Vec<Message> {
        self.touch(now);
        let limit = self.options.effective_receive_limit();
        let deadline = now + self.options.visibility_timeout;
        let mut result = Vec::new();

        for group in self.groups.values_mut() {
            if result.len() >= limit {
                return result;
            }
            if group.is_owned_by(owner) {
                group.deliver(owner, deadline, limit, &mut result);
            }
        }

        if self.options.owner_only {
            return result;
        }

        for group in self.groups.values_mut() {
            if result.len() >= limit {
                break;
            }
            if !group.is_leased() && group.has_deliverable() {
                group.deliver(owner, deadline, limit, &mut result);
            }
        }

        result
    }

    /// Acknowledge a message by `{ id, groupId }`
    pub fn remove(&mut self, message: &Message, now: Instant) -> QueueResult<()> {
        self.touch(now);
        let group_id = message.effective_group();

        let Some(group) = self.groups.get_mut(group_id) else {
            return Err(QueueError::GroupNotFound {
                queue_id: self.id.clone(),
                group_id: group_id.to_string(),
            });
        };

        // The lease stays with its owner even when the backlog empties;
        // only the sweep releases it.
        match group.remove(&message.id) {
            Some(_) => {
                self.held -= 1;
                Ok(())
            }
            None => Err(QueueError::MessageNotFound {
                queue_id: self.id.clone(),
                group_id: group_id.to_string(),
                message_id: message.id.clone(),
            }),
        }
    }

    /// Expire leases, drop abandoned messages and cull empty groups
    pub fn sweep(&mut self, now: Instant) -> QueueSweep {
        let mut report = QueueSweep::default();

        for group in self.groups.values_mut() {
            if group.expire_lease(now) {
                report.leases_expired += 1;
            }
        }
        report.groups_removed += self.groups.retain(|_, group| !group.is_garbage());

        let max_age = self.options.message_dead_timeout;
        for group in self.groups.values_mut() {
            report.messages_culled += group.cull_abandoned(now, max_age);
        }
        report.groups_removed += self.groups.retain(|_, group| !group.is_garbage());

        self.held = self.held.saturating_sub(report.messages_culled);
        report
    }

    /// Empty and idle for longer than `queueDeadTimeout`
    pub fn is_dead(&self, now: Instant) -> bool {
        self.held == 0
            && now.saturating_duration_since(self.last_activity) > self.options.queue_dead_timeout
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let mut owner_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut owned_groups = 0;
        let mut pending = 0;
        for group in self.groups.values() {
            pending += group.pending_count();
            if let Some(owner) = group.owner() {
                owned_groups += 1;
                *owner_counts.entry(owner.to_string()).or_insert(0) += 1;
            }
        }

        QueueSnapshot {
            queue_id: self.id.clone(),
            held: self.held,
            pending,
            groups: self.groups.len(),
            owned_groups,
            owner_counts,
            next_sequence: self.next_sequence,
        }
    }

    /// Ids of non-empty groups and their owners, for diagnostics logging
    pub fn group_summaries(&self) -> Vec<(String, usize, Option<String>)> {
        self.groups
            .values()
            .map(|group| {
                (
                    group.id().to_string(),
                    group.len(),
                    group.owner().map(str::to_string),
                )
            })
            .collect()
    }
}
