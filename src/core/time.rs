//! Clock abstraction for lease deadlines, message ages and long-poll windows
//!
//! Every deadline in the broker is computed from a [`TimeProvider`] so the
//! leasing and expiry rules can be exercised deterministically in tests.

#[cfg(test)]
use std::sync::Mutex;
use std::sync::Arc;
#[cfg(test)]
use std::time::Duration;
use std::time::Instant;

/// Monotonic time source used by the queue engine
pub trait TimeProvider: Send + Sync {
    /// Current monotonic time
    fn now(&self) -> Instant;
}

/// Production time provider backed by [`Instant::now`]
#[derive(Debug, Default, Clone)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Shared handle to the system clock
pub fn system_clock() -> Arc<dyn TimeProvider> {
    Arc::new(SystemTimeProvider)
}

/// Manually advanced clock for deterministic tests
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct MockTimeProvider {
    current_instant: Arc<Mutex<Instant>>,
}

#[cfg(test)]
impl MockTimeProvider {
    pub fn new() -> Self {
        Self {
            current_instant: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Move the clock forward by `duration`
    pub fn advance_time(&self, duration: Duration) {
        let mut instant = self.current_instant.lock().unwrap();
        *instant += duration;
    }
}

#[cfg(test)]
impl TimeProvider for MockTimeProvider {
    fn now(&self) -> Instant {
        *self.current_instant.lock().unwrap()
    }
}
