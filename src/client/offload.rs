//! Payload offload decorator
//!
//! Contents whose JSON encoding would push a message past the broker's size
//! limit are saved to a [`BlobStore`] and replaced by a reference. Receive
//! loads them back and leaves `blob_ref` set on the delivered message; the
//! blob is deleted when that message is removed, so a redelivery after lease
//! expiry can load it again.

use crate::blob::BlobStore;
use crate::client::error::{ClientError, ClientResult};
use crate::client::traits::QueueTransport;
use crate::queue::{Message, QueueOptionsPatch};
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;

/// Largest message the broker is expected to accept, in bytes
pub const DEFAULT_MAXIMUM_MESSAGE_SIZE: usize = 262_144;

/// Room left for the envelope and message fields around the contents
pub const ENVELOPE_HEADROOM: usize = 1_000;

pub struct OffloadingTransport<T, B> {
    inner: T,
    store: B,
    threshold: usize,
}

impl<T: QueueTransport, B: BlobStore> OffloadingTransport<T, B> {
    pub fn new(inner: T, store: B) -> Self {
        Self::with_maximum_size(inner, store, DEFAULT_MAXIMUM_MESSAGE_SIZE)
    }

    pub fn with_maximum_size(inner: T, store: B, maximum_message_size: usize) -> Self {
        Self {
            inner,
            store,
            threshold: maximum_message_size.saturating_sub(ENVELOPE_HEADROOM),
        }
    }

    /// Contents larger than this many bytes go to the blob store
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn store(&self) -> &B {
        &self.store
    }

    /// Message as it should travel: offloaded copy, or `None` when small enough
    async fn offload(&self, message: &Message) -> ClientResult<Option<Message>> {
        let encoded = serde_json::to_vec(&message.contents)?;
        if encoded.len() <= self.threshold {
            return Ok(None);
        }

        let size = encoded.len();
        let blob_ref = self.store.save(encoded).await?;
        log::debug!("Offloaded {} bytes of {} to {}", size, message.id, blob_ref);

        let mut offloaded = message.clone();
        offloaded.contents = Value::Null;
        offloaded.blob_ref = Some(blob_ref);
        Ok(Some(offloaded))
    }

    async fn load_contents(&self, blob_ref: &str) -> ClientResult<Value> {
        let bytes = self.store.load(blob_ref).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Put offloaded contents back; on failure the message stays offloaded
    async fn restore(&self, mut message: Message) -> Message {
        let Some(blob_ref) = message.blob_ref.as_deref() else {
            return message;
        };
        match self.load_contents(blob_ref).await {
            Ok(contents) => message.contents = contents,
            Err(e) => log::warn!(
                "Could not restore {} from blob {}: {}",
                message.id,
                blob_ref,
                e
            ),
        }
        message
    }
}

#[async_trait]
impl<T: QueueTransport, B: BlobStore> QueueTransport for OffloadingTransport<T, B> {
    async fn set_options(&self, queue_id: &str, options: &QueueOptionsPatch) -> ClientResult<()> {
        self.inner.set_options(queue_id, options).await
    }

    async fn claim(&self, queue_id: &str, owner: &str, group_id: &str) -> ClientResult<()> {
        self.inner.claim(queue_id, owner, group_id).await
    }

    async fn send(&self, queue_id: &str, message: Message) -> ClientResult<()> {
        let offloaded = match self.offload(&message).await {
            Ok(Some(offloaded)) => offloaded,
            Ok(None) => return self.inner.send(queue_id, message).await,
            Err(reason) => return Err(ClientError::undelivered(message, reason)),
        };

        let blob_ref = offloaded.blob_ref.clone();
        match self.inner.send(queue_id, offloaded).await {
            Ok(()) => Ok(()),
            Err(error) => {
                if let Some(blob_ref) = blob_ref {
                    if let Err(e) = self.store.delete(&blob_ref).await {
                        log::warn!("Could not delete blob {} of failed send: {}", blob_ref, e);
                    }
                }
                let reason = match error {
                    ClientError::Undelivered { reason, .. } => *reason,
                    other => other,
                };
                Err(ClientError::undelivered(message, reason))
            }
        }
    }

    async fn receive(&self, queue_id: &str, owner: &str) -> ClientResult<Vec<Message>> {
        let messages = self.inner.receive(queue_id, owner).await?;
        Ok(join_all(messages.into_iter().map(|message| self.restore(message))).await)
    }

    async fn remove(&self, queue_id: &str, message: &Message) -> ClientResult<()> {
        self.inner.remove(queue_id, message).await?;
        if let Some(blob_ref) = message.blob_ref.as_deref() {
            if let Err(e) = self.store.delete(blob_ref).await {
                log::warn!("Could not delete blob {} of removed {}: {}", blob_ref, message.id, e);
            }
        }
        Ok(())
    }
}
