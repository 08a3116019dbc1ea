//! Client Error Types

use crate::blob::BlobError;
use crate::queue::{Message, QueueError};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Nothing listening; the broker is probably restarting
    #[error("connection refused by {url}")]
    ConnectionRefused {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway error: HTTP {status}")]
    Gateway { status: u16 },

    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },

    #[error("cannot encode or decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("server reported {message}")]
    Server { message: String },

    /// A send that failed for good; the message is handed back for resending
    #[error("message {} not delivered: {reason}", .message.id)]
    Undelivered {
        message: Box<Message>,
        #[source]
        reason: Box<ClientError>,
    },

    #[error("blob store: {0}")]
    Blob(#[from] BlobError),
}

impl ClientError {
    /// Transient transport failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Gateway { .. })
    }

    pub fn undelivered(message: Message, reason: ClientError) -> Self {
        ClientError::Undelivered {
            message: Box::new(message),
            reason: Box::new(reason),
        }
    }

    /// The message a failed send handed back, if any
    pub fn into_undelivered(self) -> Option<Message> {
        match self {
            ClientError::Undelivered { message, .. } => Some(*message),
            _ => None,
        }
    }
}

impl From<QueueError> for ClientError {
    fn from(error: QueueError) -> Self {
        ClientError::Server {
            message: error.to_string(),
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
