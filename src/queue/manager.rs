//! QueueManager - registry of queues and the entry point for engine operations
//!
//! The manager owns every queue and is the only way to reach one. Queues are
//! created lazily the first time they are referenced (except by `remove`)
//! and discarded by the sweep once they have sat empty past their queue dead
//! timeout. The manager itself is not synchronised; the broker wraps it in a
//! mutex and is its single writer.

use crate::core::time::{system_clock, TimeProvider};
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::internal::Queue;
use crate::queue::message::Message;
use crate::queue::options::{QueueOptions, QueueOptionsPatch};
use crate::queue::ordered::OrderedMap;
use crate::queue::types::{BrokerStats, QueueSnapshot, SweepReport};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    sent: u64,
    received: u64,
    removed: u64,
    culled: u64,
    queues_culled: u64,
}

/// Registry of queues keyed by queue id
///
/// # Example
///
/// ```rust
/// use memsqs::queue::{Message, QueueManager};
/// use serde_json::json;
///
/// let mut manager = QueueManager::new();
/// manager.send("jobs", Message::new("m1", "g1", json!({"n": 1}))).unwrap();
///
/// let batch = manager.receive("jobs", "worker-1");
/// assert_eq!(batch.len(), 1);
/// assert_eq!(batch[0].sequence_number, Some(1));
///
/// manager.remove("jobs", &batch[0].reference()).unwrap();
/// assert_eq!(manager.stats().held(), 0);
/// ```
pub struct QueueManager {
    clock: Arc<dyn TimeProvider>,
    defaults: QueueOptions,
    queues: OrderedMap<Queue>,
    counters: Counters,
}

impl Default for QueueManager {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueManager {
    pub fn new() -> Self {
        Self::with_clock(QueueOptions::default(), system_clock())
    }

    /// Manager whose new queues start from `defaults`, reading time from `clock`
    pub fn with_clock(defaults: QueueOptions, clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            clock,
            defaults,
            queues: OrderedMap::new(),
            counters: Counters::default(),
        }
    }

    /// Options given to queues when they are created
    pub fn defaults(&self) -> &QueueOptions {
        &self.defaults
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    fn queue_mut(&mut self, queue_id: &str, now: Instant) -> &mut Queue {
        let defaults = &self.defaults;
        self.queues.get_or_insert_with(queue_id, || {
            log::debug!("Creating queue {}", queue_id);
            Queue::new(queue_id, defaults.clone(), now)
        })
    }

    /// Override some of a queue's options, creating the queue if needed
    pub fn set_options(&mut self, queue_id: &str, patch: &QueueOptionsPatch) -> QueueResult<()> {
        let now = self.now();
        let queue = self.queue_mut(queue_id, now);
        queue.set_options(patch);
        log::debug!("Queue {}: options now {:?}", queue_id, queue.options());
        Ok(())
    }

    /// Effective options of a queue; defaults when it does not exist yet
    pub fn options(&self, queue_id: &str) -> QueueOptions {
        self.queues
            .get(queue_id)
            .map(|queue| queue.options().clone())
            .unwrap_or_else(|| self.defaults.clone())
    }

    /// Whether empty receives on this queue should be parked
    pub fn is_longpoll(&self, queue_id: &str) -> bool {
        self.queues
            .get(queue_id)
            .map_or(self.defaults.longpoll, |queue| queue.options().longpoll)
    }

    pub fn claim(&mut self, queue_id: &str, owner: &str, group_id: &str) -> QueueResult<()> {
        let now = self.now();
        self.queue_mut(queue_id, now).claim(owner, group_id, now)
    }

    /// Enqueue `message`; returns the number of copies stored
    pub fn send(&mut self, queue_id: &str, message: Message) -> QueueResult<usize> {
        let now = self.now();
        let stored = self.queue_mut(queue_id, now).send(message, now)?;
        self.counters.sent += stored as u64;
        Ok(stored)
    }

    pub fn receive(&mut self, queue_id: &str, owner: &str) -> Vec<Message> {
        let now = self.now();
        let messages = self.queue_mut(queue_id, now).receive(owner, now);
        self.counters.received += messages.len() as u64;
        messages
    }

    /// Acknowledge a delivered message. Never creates the queue.
    pub fn remove(&mut self, queue_id: &str, message: &Message) -> QueueResult<()> {
        let now = self.now();
        let queue = self
            .queues
            .get_mut(queue_id)
            .ok_or_else(|| QueueError::QueueNotFound {
                queue_id: queue_id.to_string(),
            })?;
        queue.remove(message, now)?;
        self.counters.removed += 1;
        Ok(())
    }

    /// Run one expiration pass over every queue
    pub fn sweep(&mut self) -> SweepReport {
        let now = self.now();
        let mut report = SweepReport::default();

        for queue in self.queues.values_mut() {
            report.absorb(queue.sweep(now));
        }
        report.queues_removed = self.queues.retain(|queue_id, queue| {
            let dead = queue.is_dead(now);
            if dead {
                log::debug!("Queue {} idle past its dead timeout, removing", queue_id);
            }
            !dead
        });

        self.counters.culled += report.messages_culled as u64;
        self.counters.queues_culled += report.queues_removed as u64;
        report
    }

    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    pub fn queue_snapshot(&self, queue_id: &str) -> Option<QueueSnapshot> {
        self.queues.get(queue_id).map(Queue::snapshot)
    }

    pub fn stats(&self) -> BrokerStats {
        BrokerStats {
            sent: self.counters.sent,
            received: self.counters.received,
            removed: self.counters.removed,
            culled: self.counters.culled,
            queues_culled: self.counters.queues_culled,
            queues: self.queues.values().map(Queue::snapshot).collect(),
        }
    }

    /// Write counters and the per-queue group layout to the log
    pub fn log_summary(&self) {
        let counters = self.counters;
        log::info!(
            "Broker: {} queues, sent {}, received {}, removed {}, culled {}, queues culled {}",
            self.queues.len(),
            counters.sent,
            counters.received,
            counters.removed,
            counters.culled,
            counters.queues_culled
        );
        for queue in self.queues.values() {
            log::info!(
                "Queue {}: held {}, {} groups",
                queue.id(),
                queue.held(),
                queue.group_count()
            );
            for (group_id, len, owner) in queue.group_summaries() {
                log::debug!(
                    "  group {}: {} messages, owner {}",
                    group_id,
                    len,
                    owner.as_deref().unwrap_or("-")
                );
            }
        }
    }
}
