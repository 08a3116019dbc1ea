//! Test modules for the queue engine
//!
//! Organised by functional area. Time-dependent behaviour is driven through
//! `MockTimeProvider`.

use crate::core::time::MockTimeProvider;
use crate::queue::api::{Message, QueueManager, QueueOptions};
use serde_json::json;
use std::sync::Arc;

mod edge_cases;

/// Manager on a mock clock with default options
pub(super) fn manager_with_clock() -> (QueueManager, MockTimeProvider) {
    manager_with_options(QueueOptions::default())
}

pub(super) fn manager_with_options(options: QueueOptions) -> (QueueManager, MockTimeProvider) {
    let clock = MockTimeProvider::new();
    let manager = QueueManager::with_clock(options, Arc::new(clock.clone()));
    (manager, clock)
}

pub(super) fn msg(id: &str, group_id: &str) -> Message {
    Message::new(id, group_id, json!({ "body": id }))
}

pub(super) fn ids(messages: &[Message]) -> Vec<&str> {
    messages.iter().map(|m| m.id.as_str()).collect()
}
