//! Per-group outbound sequencing
//!
//! Sends addressed to the same queue and group pass through one FIFO async
//! lock, so they reach the wire one after another in call order. Sends to
//! different groups proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LaneKey = (String, String);

#[derive(Debug, Default)]
pub struct GroupSequencer {
    lanes: Mutex<HashMap<LaneKey, Arc<AsyncMutex<()>>>>,
}

/// Turn on a group's lane; the next caller proceeds when this is dropped
#[derive(Debug)]
pub struct LaneTurn {
    _turn: OwnedMutexGuard<()>,
}

impl GroupSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the turn on `(queue_id, group_id)`
    pub async fn acquire(&self, queue_id: &str, group_id: &str) -> LaneTurn {
        let lane = {
            let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
            // Lanes nobody holds or waits on
            lanes.retain(|_, lane| Arc::strong_count(lane) > 1);
            lanes
                .entry((queue_id.to_string(), group_id.to_string()))
                .or_default()
                .clone()
        };
        LaneTurn {
            _turn: lane.lock_owned().await,
        }
    }

    /// Lanes currently tracked
    pub fn lane_count(&self) -> usize {
        self.lanes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
