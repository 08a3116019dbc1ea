//! Long-poll scheduler
//!
//! Receives that found nothing on a long-poll queue are parked here with a
//! deadline and a oneshot responder. A parked receive is retried when a send
//! lands on its queue and on every scheduler tick; it finishes with the first
//! non-empty result, or with an empty list once its deadline has passed.

use crate::queue::{Message, QueueManager};
use std::time::Instant;
use tokio::sync::oneshot;

/// Default time a receive may stay parked
pub const DEFAULT_LONGPOLL_WINDOW_MS: u64 = 5_000;

/// Default interval of the timeout trigger
pub const DEFAULT_LONGPOLL_TICK_MS: u64 = 1_000;

#[derive(Debug)]
struct ParkedReceive {
    queue_id: String,
    owner: String,
    deadline: Instant,
    responder: oneshot::Sender<Vec<Message>>,
}

#[derive(Debug, Default)]
pub(crate) struct LongPoll {
    parked: Vec<ParkedReceive>,
}

impl LongPoll {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.parked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parked.is_empty()
    }

    /// Park a receive until `deadline`; the result arrives on the returned channel
    pub fn park(
        &mut self,
        queue_id: &str,
        owner: &str,
        deadline: Instant,
    ) -> oneshot::Receiver<Vec<Message>> {
        let (responder, receiver) = oneshot::channel();
        self.parked.push(ParkedReceive {
            queue_id: queue_id.to_string(),
            owner: owner.to_string(),
            deadline,
            responder,
        });
        receiver
    }

    /// Push trigger: retry receives parked on `queue_id`
    pub fn on_send(&mut self, queue_id: &str, manager: &mut QueueManager) -> usize {
        self.retry(manager, Some(queue_id))
    }

    /// Timeout trigger: retry every parked receive and finish the overdue ones
    pub fn tick(&mut self, manager: &mut QueueManager) -> usize {
        self.retry(manager, None)
    }

    /// Finish every parked receive with an empty result
    pub fn release_all(&mut self) -> usize {
        let released = self.parked.len();
        for entry in self.parked.drain(..) {
            let _ = entry.responder.send(Vec::new());
        }
        released
    }

    fn retry(&mut self, manager: &mut QueueManager, only_queue: Option<&str>) -> usize {
        let now = manager.now();
        let mut finished = 0;

        for entry in std::mem::take(&mut self.parked) {
            // Caller went away: drop without receiving on its behalf
            if entry.responder.is_closed() {
                log::trace!(
                    "Discarding abandoned long-poll for {} on queue {}",
                    entry.owner,
                    entry.queue_id
                );
                continue;
            }
            if only_queue.is_some_and(|queue_id| queue_id != entry.queue_id) {
                self.parked.push(entry);
                continue;
            }

            let messages = manager.receive(&entry.queue_id, &entry.owner);
            if !messages.is_empty() {
                let count = messages.len();
                if entry.responder.send(messages).is_err() {
                    log::debug!(
                        "Long-poll for {} on queue {} closed with {} messages in flight",
                        entry.owner,
                        entry.queue_id,
                        count
                    );
                }
                finished += 1;
            } else if now >= entry.deadline {
                let _ = entry.responder.send(Vec::new());
                finished += 1;
            } else {
                self.parked.push(entry);
            }
        }

        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::{MockTimeProvider, TimeProvider};
    use crate::queue::QueueOptions;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::oneshot::error::TryRecvError;

    fn setup() -> (QueueManager, MockTimeProvider, LongPoll) {
        let clock = MockTimeProvider::new();
        let manager = QueueManager::with_clock(QueueOptions::default(), Arc::new(clock.clone()));
        (manager, clock, LongPoll::new())
    }

    #[test]
    fn test_push_trigger_completes_matching_queue_only() {
        let (mut manager, clock, mut longpoll) = setup();
        let deadline = clock.now() + Duration::from_secs(5);
        let mut on_q1 = longpoll.park("q1", "A", deadline);
        let mut on_q2 = longpoll.park("q2", "A", deadline);

        manager
            .send("q1", Message::new("m1", "g1", json!(1)))
            .unwrap();
        assert_eq!(longpoll.on_send("q1", &mut manager), 1);

        let delivered = on_q1.try_recv().unwrap();
        assert_eq!(delivered[0].id, "m1");
        assert!(matches!(on_q2.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(longpoll.len(), 1);
    }

    #[test]
    fn test_tick_finishes_overdue_entries_empty() {
        let (mut manager, clock, mut longpoll) = setup();
        let mut receiver = longpoll.park("q", "A", clock.now() + Duration::from_secs(5));

        assert_eq!(longpoll.tick(&mut manager), 0);
        assert!(matches!(receiver.try_recv(), Err(TryRecvError::Empty)));

        clock.advance_time(Duration::from_secs(5));
        assert_eq!(longpoll.tick(&mut manager), 1);
        assert_eq!(receiver.try_recv().unwrap(), Vec::<Message>::new());
        assert!(longpoll.is_empty());
    }

    #[test]
    fn test_closed_receiver_is_discarded_without_delivery() {
        let (mut manager, clock, mut longpoll) = setup();
        let receiver = longpoll.park("q", "A", clock.now() + Duration::from_secs(5));
        drop(receiver);

        manager.send("q", Message::new("m1", "g1", json!(1))).unwrap();
        assert_eq!(longpoll.on_send("q", &mut manager), 0);
        assert!(longpoll.is_empty());

        // Nothing was marked pending for the vanished caller
        assert_eq!(manager.receive("q", "B").len(), 1);
    }

    #[test]
    fn test_release_all_answers_everyone() {
        let (_manager, clock, mut longpoll) = setup();
        let mut first = longpoll.park("q", "A", clock.now());
        let mut second = longpoll.park("q", "B", clock.now());

        assert_eq!(longpoll.release_all(), 2);
        assert!(first.try_recv().unwrap().is_empty());
        assert!(second.try_recv().unwrap().is_empty());
    }
}
