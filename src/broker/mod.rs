//! Broker - the single-writer execution context around the queue engine
//!
//! One mutex guards the [`QueueManager`] and the long-poll scheduler. Every
//! engine call, long-poll trigger and sweep runs under it; the lock is never
//! held across an `.await`. Parked receives wait on their oneshot channel
//! outside the lock.
//!
//! Background maintenance (expiration sweep and long-poll tick) runs in a
//! task started by [`Broker::spawn_maintenance`] that exits when shutdown is
//! broadcast.
//!
//! # Example
//!
//! ```rust
//! use memsqs::broker::{Broker, BrokerSettings};
//! use memsqs::queue::{Message, QueueManager};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let broker = Broker::new(QueueManager::new(), BrokerSettings::default());
//! broker.send("jobs", Message::new("m1", "g1", json!("work")))?;
//!
//! let batch = broker.receive("jobs", "worker-1").await?;
//! broker.remove("jobs", &batch[0].reference())?;
//! # Ok(())
//! # }
//! ```

pub mod longpoll;

use crate::core::sync::handle_mutex_poison;
use crate::queue::{
    BrokerStats, Message, QueueError, QueueManager, QueueOptionsPatch, QueueResult, SweepReport,
};
use longpoll::{LongPoll, DEFAULT_LONGPOLL_TICK_MS, DEFAULT_LONGPOLL_WINDOW_MS};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default interval of the expiration sweep
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 5_000;

/// Timing of the broker's background work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    /// How long an empty receive may stay parked
    pub longpoll_window: Duration,
    /// Interval of the long-poll timeout trigger
    pub longpoll_tick: Duration,
    /// Interval of the expiration sweep
    pub sweep_interval: Duration,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            longpoll_window: Duration::from_millis(DEFAULT_LONGPOLL_WINDOW_MS),
            longpoll_tick: Duration::from_millis(DEFAULT_LONGPOLL_TICK_MS),
            sweep_interval: Duration::from_millis(DEFAULT_SWEEP_INTERVAL_MS),
        }
    }
}

struct BrokerState {
    manager: QueueManager,
    longpoll: LongPoll,
}

/// Cloneable handle to the shared broker state
#[derive(Clone)]
pub struct Broker {
    state: Arc<Mutex<BrokerState>>,
    settings: BrokerSettings,
}

impl Broker {
    pub fn new(manager: QueueManager, settings: BrokerSettings) -> Self {
        Self {
            state: Arc::new(Mutex::new(BrokerState {
                manager,
                longpoll: LongPoll::new(),
            })),
            settings,
        }
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    fn lock(&self) -> QueueResult<MutexGuard<'_, BrokerState>> {
        handle_mutex_poison(self.state.lock(), |message| QueueError::OperationFailed { message })
    }

    pub fn set_options(&self, queue_id: &str, patch: &QueueOptionsPatch) -> QueueResult<()> {
        self.lock()?.manager.set_options(queue_id, patch)
    }

    pub fn claim(&self, queue_id: &str, owner: &str, group_id: &str) -> QueueResult<()> {
        self.lock()?.manager.claim(queue_id, owner, group_id)
    }

    /// Enqueue and wake receives parked on the same queue
    pub fn send(&self, queue_id: &str, message: Message) -> QueueResult<usize> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let stored = state.manager.send(queue_id, message)?;
        if stored > 0 && !state.longpoll.is_empty() {
            let woken = state.longpoll.on_send(queue_id, &mut state.manager);
            if woken > 0 {
                log::trace!("Send on {} completed {} parked receives", queue_id, woken);
            }
        }
        Ok(stored)
    }

    /// Receive for `owner`, parking up to the long-poll window when the
    /// queue has nothing deliverable and long-poll is enabled
    pub async fn receive(&self, queue_id: &str, owner: &str) -> QueueResult<Vec<Message>> {
        let parked = {
            let mut state = self.lock()?;
            let messages = state.manager.receive(queue_id, owner);
            if !messages.is_empty() || !state.manager.is_longpoll(queue_id) {
                return Ok(messages);
            }
            let deadline = state.manager.now() + self.settings.longpoll_window;
            state.longpoll.park(queue_id, owner, deadline)
        };

        // The tick normally answers first; this bound only matters when the
        // maintenance task is not running.
        let bound = self.settings.longpoll_window + self.settings.longpoll_tick * 2;
        match tokio::time::timeout(bound, parked).await {
            Ok(Ok(messages)) => Ok(messages),
            Ok(Err(_)) => Ok(Vec::new()),
            Err(_) => {
                log::debug!("Long-poll for {} on {} timed out unanswered", owner, queue_id);
                Ok(Vec::new())
            }
        }
    }

    pub fn remove(&self, queue_id: &str, message: &Message) -> QueueResult<()> {
        self.lock()?.manager.remove(queue_id, message)
    }

    pub fn is_longpoll(&self, queue_id: &str) -> QueueResult<bool> {
        Ok(self.lock()?.manager.is_longpoll(queue_id))
    }

    pub fn sweep(&self) -> QueueResult<SweepReport> {
        Ok(self.lock()?.manager.sweep())
    }

    /// Run the long-poll timeout trigger once; returns how many receives finished
    pub fn tick_longpoll(&self) -> QueueResult<usize> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        Ok(state.longpoll.tick(&mut state.manager))
    }

    pub fn parked_count(&self) -> QueueResult<usize> {
        Ok(self.lock()?.longpoll.len())
    }

    /// Answer every parked receive with an empty result
    pub fn release_parked(&self) -> QueueResult<usize> {
        Ok(self.lock()?.longpoll.release_all())
    }

    pub fn stats(&self) -> QueueResult<BrokerStats> {
        Ok(self.lock()?.manager.stats())
    }

    pub fn log_summary(&self) -> QueueResult<()> {
        self.lock()?.manager.log_summary();
        Ok(())
    }

    fn run_sweep(&self) {
        match self.sweep() {
            Ok(report) if report.culled_anything() => log::info!(
                "Sweep: culled {} messages and {} queues, expired {} leases",
                report.messages_culled,
                report.queues_removed,
                report.leases_expired
            ),
            Ok(report) if !report.is_empty() => log::debug!(
                "Sweep: expired {} leases, removed {} groups",
                report.leases_expired,
                report.groups_removed
            ),
            Ok(_) => {}
            Err(e) => log::warn!("Sweep failed: {}", e),
        }
    }

    fn run_longpoll_tick(&self) {
        if let Err(e) = self.tick_longpoll() {
            log::warn!("Long-poll tick failed: {}", e);
        }
    }

    /// Start the sweep and long-poll timers; they stop when `shutdown` fires
    pub fn spawn_maintenance(&self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let broker = self.clone();
        tokio::spawn(async move {
            let mut sweep = tokio::time::interval(broker.settings.sweep_interval);
            let mut tick = tokio::time::interval(broker.settings.longpoll_tick);
            sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            log::debug!(
                "Broker maintenance started: sweep every {:?}, long-poll tick every {:?}",
                broker.settings.sweep_interval,
                broker.settings.longpoll_tick
            );
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = sweep.tick() => broker.run_sweep(),
                    _ = tick.tick() => broker.run_longpoll_tick(),
                }
            }

            match broker.release_parked() {
                Ok(0) => {}
                Ok(released) => log::debug!("Released {} parked receives on shutdown", released),
                Err(e) => log::warn!("Could not release parked receives: {}", e),
            }
            log::debug!("Broker maintenance stopped");
        })
    }
}
