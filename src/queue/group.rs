//! Message groups: a FIFO backlog plus an optional lease
//!
//! A lease is nothing more than an owner string and a deadline. Nothing
//! watches the deadline; the expiration sweep compares it with the clock
//! and releases the lease when it has passed.

use crate::queue::message::Message;
use crate::queue::ordered::OrderedMap;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Backlog entry
#[derive(Debug, Clone)]
pub(crate) struct MessageHolder {
    pub message: Message,
    /// Delivered and awaiting acknowledgement
    pub pending: bool,
    pub enqueued_at: Instant,
}

/// A group's backlog, in send order
pub(crate) type OrderedMessageList = OrderedMap<MessageHolder>;

/// Time-bounded exclusive ownership of a group
#[derive(Debug, Clone)]
pub(crate) struct Lease {
    pub owner: String,
    pub deadline: Instant,
    /// Ids delivered under this lease and not yet removed
    pub delivered: HashSet<String>,
}

impl Lease {
    fn new(owner: &str, deadline: Instant) -> Self {
        Self {
            owner: owner.to_string(),
            deadline,
            delivered: HashSet::new(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Group {
    id: String,
    backlog: OrderedMessageList,
    lease: Option<Lease>,
}

impl Group {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            backlog: OrderedMessageList::new(),
            lease: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner(&self) -> Option<&str> {
        self.lease.as_ref().map(|lease| lease.owner.as_str())
    }

    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.owner() == Some(owner)
    }

    pub fn is_leased(&self) -> bool {
        self.lease.is_some()
    }

    /// Unleased with nothing left to deliver
    pub fn is_garbage(&self) -> bool {
        self.lease.is_none() && self.backlog.is_empty()
    }

    pub fn len(&self) -> usize {
        self.backlog.len()
    }

    pub fn pending_count(&self) -> usize {
        self.backlog.values().filter(|h| h.pending).count()
    }

    pub fn lease_deadline(&self) -> Option<Instant> {
        self.lease.as_ref().map(|lease| lease.deadline)
    }

    /// Grant or refresh the lease for `owner`.
    ///
    /// Fails with the current owner when another consumer holds it.
    pub fn claim(&mut self, owner: &str, deadline: Instant) -> Result<(), String> {
        match self.lease.as_mut() {
            None => {
                self.lease = Some(Lease::new(owner, deadline));
                Ok(())
            }
            Some(lease) if lease.owner == owner => {
                lease.deadline = deadline;
                Ok(())
            }
            Some(lease) => Err(lease.owner.clone()),
        }
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.backlog.contains_key(message_id)
    }

    /// Append to the backlog; a duplicate id hands the message back
    pub fn insert(&mut self, message: Message, now: Instant) -> Result<(), Message> {
        let key = message.id.clone();
        self.backlog
            .insert(
                key,
                MessageHolder {
                    message,
                    pending: false,
                    enqueued_at: now,
                },
            )
            .map_err(|holder| holder.message)
    }

    pub fn remove(&mut self, message_id: &str) -> Option<Message> {
        let holder = self.backlog.remove(message_id)?;
        if let Some(lease) = self.lease.as_mut() {
            lease.delivered.remove(message_id);
        }
        Some(holder.message)
    }

    pub fn has_deliverable(&self) -> bool {
        self.backlog.values().any(|h| !h.pending)
    }

    /// Deliver non-pending messages in order until `result` reaches `limit`.
    ///
    /// Takes the lease for `owner` if the group is unleased; each delivered
    /// message pushes the lease deadline out to `deadline`. Callers must not
    /// invoke this on a group leased to someone else.
    pub fn deliver(
        &mut self,
        owner: &str,
        deadline: Instant,
        limit: usize,
        result: &mut Vec<Message>,
    ) -> usize {
        debug_assert!(self.lease.is_none() || self.is_owned_by(owner));

        let mut delivered = 0;
        for holder in self.backlog.values_mut() {
            if result.len() >= limit {
                break;
            }
            if holder.pending {
                continue;
            }
            let lease = self.lease.get_or_insert_with(|| Lease::new(owner, deadline));
            holder.pending = true;
            lease.delivered.insert(holder.message.id.clone());
            lease.deadline = deadline;
            result.push(holder.message.clone());
            delivered += 1;
        }
        delivered
    }

    /// Release the lease if its deadline has passed, making pending messages
    /// deliverable again. Returns true when a lease was released.
    pub fn expire_lease(&mut self, now: Instant) -> bool {
        match &self.lease {
            Some(lease) if now >= lease.deadline => {
                for holder in self.backlog.values_mut() {
                    holder.pending = false;
                }
                self.lease = None;
                true
            }
            _ => false,
        }
    }

    /// Drop messages older than `max_age`, pending or not; returns how many
    pub fn cull_abandoned(&mut self, now: Instant, max_age: Duration) -> usize {
        let lease = &mut self.lease;
        self.backlog.retain(|id, holder| {
            let abandoned = now.saturating_duration_since(holder.enqueued_at) > max_age;
            if abandoned {
                if let Some(lease) = lease.as_mut() {
                    lease.delivered.remove(id);
                }
            }
            !abandoned
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn group_with(ids: &[&str], now: Instant) -> Group {
        let mut group = Group::new("g1");
        for id in ids {
            group.insert(Message::new(*id, "g1", Value::Null), now).unwrap();
        }
        group
    }

    fn ids(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_claim_grant_refresh_and_conflict() {
        let now = Instant::now();
        let mut group = Group::new("g1");

        assert!(group.claim("A", now + Duration::from_secs(1)).is_ok());
        assert!(group.claim("A", now + Duration::from_secs(5)).is_ok());
        assert_eq!(group.lease_deadline(), Some(now + Duration::from_secs(5)));

        assert_eq!(group.claim("B", now), Err("A".to_string()));
        assert!(group.is_owned_by("A"));
    }

    #[test]
    fn test_deliver_marks_pending_and_respects_limit() {
        let now = Instant::now();
        let mut group = group_with(&["m1", "m2", "m3"], now);
        let deadline = now + Duration::from_secs(30);

        let mut result = Vec::new();
        assert_eq!(group.deliver("A", deadline, 2, &mut result), 2);
        assert_eq!(ids(&result), vec!["m1", "m2"]);
        assert!(group.is_owned_by("A"));
        assert_eq!(group.pending_count(), 2);

        let mut more = Vec::new();
        assert_eq!(group.deliver("A", deadline, 10, &mut more), 1);
        assert_eq!(ids(&more), vec!["m3"]);
        assert!(!group.has_deliverable());
    }

    #[test]
    fn test_expired_lease_clears_pending() {
        let now = Instant::now();
        let mut group = group_with(&["m1"], now);
        let deadline = now + Duration::from_secs(30);
        group.deliver("A", deadline, 10, &mut Vec::new());

        assert!(!group.expire_lease(now + Duration::from_secs(29)));
        assert!(group.expire_lease(deadline));
        assert!(!group.is_leased());
        assert!(group.has_deliverable());
        assert!(!group.is_garbage());
    }

    #[test]
    fn test_remove_keeps_lease() {
        let now = Instant::now();
        let mut group = group_with(&["m1"], now);
        group.deliver("A", now + Duration::from_secs(30), 10, &mut Vec::new());

        assert!(group.remove("m1").is_some());
        assert!(group.remove("m1").is_none());
        assert_eq!(group.len(), 0);
        assert!(group.is_owned_by("A"));
        assert!(!group.is_garbage());
    }

    #[test]
    fn test_cull_abandoned_drops_old_messages() {
        let start = Instant::now();
        let mut group = group_with(&["old"], start);
        group
            .insert(
                Message::new("young", "g1", Value::Null),
                start + Duration::from_secs(50),
            )
            .unwrap();

        let culled = group.cull_abandoned(start + Duration::from_secs(61), Duration::from_secs(60));

        assert_eq!(culled, 1);
        assert!(!group.contains("old"));
        assert!(group.contains("young"));
    }

    #[test]
    fn test_duplicate_insert_returns_message() {
        let now = Instant::now();
        let mut group = group_with(&["m1"], now);
        let rejected = group
            .insert(Message::new("m1", "g1", Value::Bool(true)), now)
            .unwrap_err();
        assert_eq!(rejected.contents, Value::Bool(true));
        assert_eq!(group.len(), 1);
    }
}
