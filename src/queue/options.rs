//! Per-queue options and the partial override object accepted by `setOptions`

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Effective options of one queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueOptions {
    /// Lease duration; also how long a delivered message stays reserved
    pub visibility_timeout: Duration,
    /// Maximum age of an unacknowledged message before it is dropped
    pub message_dead_timeout: Duration,
    /// Idle time after which an empty queue is discarded
    pub queue_dead_timeout: Duration,
    /// Upper bound on messages returned by one receive
    pub receive_limit: usize,
    /// Park empty receives instead of answering immediately
    pub longpoll: bool,
    /// Only serve groups already leased to the caller
    pub owner_only: bool,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            visibility_timeout: Duration::from_secs(30),
            message_dead_timeout: Duration::from_secs(30 * 60),
            queue_dead_timeout: Duration::from_secs(30 * 60),
            receive_limit: 10,
            longpoll: true,
            owner_only: false,
        }
    }
}

impl QueueOptions {
    /// Receive limit, never below one
    pub fn effective_receive_limit(&self) -> usize {
        self.receive_limit.max(1)
    }

    /// Copy of these options with `patch` applied
    pub fn merged(&self, patch: &QueueOptionsPatch) -> QueueOptions {
        let mut merged = self.clone();
        patch.apply(&mut merged);
        merged
    }
}

/// Partial options; present fields override, absent fields keep their value
///
/// Durations travel as milliseconds. The legacy option names
/// (`timeoutVisibility`, `timeoutDead`, `timeoutQueueDead`) are accepted as
/// aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueOptionsPatch {
    #[serde(
        default,
        alias = "timeoutVisibility",
        alias = "visibility_timeout_ms",
        skip_serializing_if = "Option::is_none"
    )]
    pub visibility_timeout: Option<u64>,
    #[serde(
        default,
        alias = "timeoutDead",
        alias = "message_dead_timeout_ms",
        skip_serializing_if = "Option::is_none"
    )]
    pub message_dead_timeout: Option<u64>,
    #[serde(
        default,
        alias = "timeoutQueueDead",
        alias = "queue_dead_timeout_ms",
        skip_serializing_if = "Option::is_none"
    )]
    pub queue_dead_timeout: Option<u64>,
    #[serde(
        default,
        alias = "receive_limit",
        skip_serializing_if = "Option::is_none"
    )]
    pub receive_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longpoll: Option<bool>,
    #[serde(default, alias = "owner_only", skip_serializing_if = "Option::is_none")]
    pub owner_only: Option<bool>,
}

impl QueueOptionsPatch {
    pub fn apply(&self, options: &mut QueueOptions) {
        if let Some(ms) = self.visibility_timeout {
            options.visibility_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.message_dead_timeout {
            options.message_dead_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.queue_dead_timeout {
            options.queue_dead_timeout = Duration::from_millis(ms);
        }
        if let Some(limit) = self.receive_limit {
            options.receive_limit = limit;
        }
        if let Some(longpoll) = self.longpoll {
            options.longpoll = longpoll;
        }
        if let Some(owner_only) = self.owner_only {
            options.owner_only = owner_only;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == QueueOptionsPatch::default()
    }

    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_message_dead_timeout(mut self, timeout: Duration) -> Self {
        self.message_dead_timeout = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_queue_dead_timeout(mut self, timeout: Duration) -> Self {
        self.queue_dead_timeout = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_receive_limit(mut self, limit: usize) -> Self {
        self.receive_limit = Some(limit);
        self
    }

    pub fn with_longpoll(mut self, longpoll: bool) -> Self {
        self.longpoll = Some(longpoll);
        self
    }

    pub fn with_owner_only(mut self, owner_only: bool) -> Self {
        self.owner_only = Some(owner_only);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = QueueOptions::default();
        assert_eq!(options.visibility_timeout, Duration::from_secs(30));
        assert_eq!(options.message_dead_timeout, Duration::from_secs(1800));
        assert_eq!(options.queue_dead_timeout, Duration::from_secs(1800));
        assert_eq!(options.receive_limit, 10);
        assert!(options.longpoll);
        assert!(!options.owner_only);
    }

    #[test]
    fn test_partial_patch_only_overrides_present_fields() {
        let patch: QueueOptionsPatch =
            serde_json::from_value(json!({"receiveLimit": 3, "longpoll": false})).unwrap();
        let merged = QueueOptions::default().merged(&patch);

        assert_eq!(merged.receive_limit, 3);
        assert!(!merged.longpoll);
        assert_eq!(merged.visibility_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_legacy_option_names_are_aliases() {
        let patch: QueueOptionsPatch = serde_json::from_value(json!({
            "timeoutVisibility": 1000,
            "timeoutDead": 2000,
            "timeoutQueueDead": 3000
        }))
        .unwrap();

        assert_eq!(patch.visibility_timeout, Some(1000));
        assert_eq!(patch.message_dead_timeout, Some(2000));
        assert_eq!(patch.queue_dead_timeout, Some(3000));
    }

    #[test]
    fn test_zero_receive_limit_still_returns_one() {
        let options = QueueOptions::default().merged(&QueueOptionsPatch::default().with_receive_limit(0));
        assert_eq!(options.effective_receive_limit(), 1);
    }

    #[test]
    fn test_builder_serializes_milliseconds() {
        let patch = QueueOptionsPatch::default().with_visibility_timeout(Duration::from_millis(1500));
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"visibilityTimeout": 1500})
        );
        assert!(QueueOptionsPatch::default().is_empty());
    }
}
