//! Queue Error Types
//!
//! Every engine failure is a value. None of these are fatal: the server
//! reports them as a generic failure and keeps serving other requests.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("claim: group {group_id} in queue {queue_id} already owned by {owner}, {claimant} cannot claim")]
    OwnershipConflict {
        queue_id: String,
        group_id: String,
        owner: String,
        claimant: String,
    },

    #[error("queue {queue_id} does not exist")]
    QueueNotFound { queue_id: String },

    #[error("queue {queue_id} has no existing group {group_id}")]
    GroupNotFound { queue_id: String, group_id: String },

    #[error("message {message_id} not found in group {group_id} of queue {queue_id}")]
    MessageNotFound {
        queue_id: String,
        group_id: String,
        message_id: String,
    },

    #[error("message {message_id} already present in group {group_id} of queue {queue_id}")]
    DuplicateMessage {
        queue_id: String,
        group_id: String,
        message_id: String,
    },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },
}

impl QueueError {
    /// Not-found conditions mean the work is already resolved
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            QueueError::QueueNotFound { .. }
                | QueueError::GroupNotFound { .. }
                | QueueError::MessageNotFound { .. }
        )
    }
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
