//! Loopback transport: the client trait served by an in-process broker

use crate::broker::Broker;
use crate::client::error::{ClientError, ClientResult};
use crate::client::traits::QueueTransport;
use crate::queue::{Message, QueueOptionsPatch};
use async_trait::async_trait;

/// Calls a shared [`Broker`] directly, long-poll parking included
#[derive(Clone)]
pub struct LoopbackClient {
    broker: Broker,
}

impl LoopbackClient {
    pub fn new(broker: Broker) -> Self {
        Self { broker }
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }
}

#[async_trait]
impl QueueTransport for LoopbackClient {
    async fn set_options(&self, queue_id: &str, options: &QueueOptionsPatch) -> ClientResult<()> {
        Ok(self.broker.set_options(queue_id, options)?)
    }

    async fn claim(&self, queue_id: &str, owner: &str, group_id: &str) -> ClientResult<()> {
        Ok(self.broker.claim(queue_id, owner, group_id)?)
    }

    async fn send(&self, queue_id: &str, message: Message) -> ClientResult<()> {
        match self.broker.send(queue_id, message.clone()) {
            Ok(_) => Ok(()),
            Err(e) => Err(ClientError::undelivered(message, e.into())),
        }
    }

    async fn receive(&self, queue_id: &str, owner: &str) -> ClientResult<Vec<Message>> {
        Ok(self.broker.receive(queue_id, owner).await?)
    }

    async fn remove(&self, queue_id: &str, message: &Message) -> ClientResult<()> {
        Ok(self.broker.remove(queue_id, message)?)
    }
}
