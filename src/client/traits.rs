//! Transport trait shared by every client

use crate::client::error::ClientResult;
use crate::queue::{Message, QueueOptionsPatch};
use async_trait::async_trait;
use std::sync::Arc;

/// The five broker operations, independent of how they reach the broker
#[async_trait]
pub trait QueueTransport: Send + Sync {
    async fn set_options(&self, queue_id: &str, options: &QueueOptionsPatch) -> ClientResult<()>;

    async fn claim(&self, queue_id: &str, owner: &str, group_id: &str) -> ClientResult<()>;

    /// Enqueue `message`; on failure the error carries the message back
    async fn send(&self, queue_id: &str, message: Message) -> ClientResult<()>;

    /// Up to the queue's receive limit; may wait out a long-poll window
    async fn receive(&self, queue_id: &str, owner: &str) -> ClientResult<Vec<Message>>;

    /// Acknowledge a received message; only `id` and `groupId` are used
    async fn remove(&self, queue_id: &str, message: &Message) -> ClientResult<()>;
}

#[async_trait]
impl<T: QueueTransport + ?Sized> QueueTransport for Arc<T> {
    async fn set_options(&self, queue_id: &str, options: &QueueOptionsPatch) -> ClientResult<()> {
        (**self).set_options(queue_id, options).await
    }

    async fn claim(&self, queue_id: &str, owner: &str, group_id: &str) -> ClientResult<()> {
        (**self).claim(queue_id, owner, group_id).await
    }

    async fn send(&self, queue_id: &str, message: Message) -> ClientResult<()> {
        (**self).send(queue_id, message).await
    }

    async fn receive(&self, queue_id: &str, owner: &str) -> ClientResult<Vec<Message>> {
        (**self).receive(queue_id, owner).await
    }

    async fn remove(&self, queue_id: &str, message: &Message) -> ClientResult<()> {
        (**self).remove(queue_id, message).await
    }
}
