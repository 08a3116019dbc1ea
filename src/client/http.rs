//! HTTP client for the wire protocol
//!
//! Each operation is one POST of a request envelope, issued through an agent
//! from the [`AgentPool`] and retried on transient transport failures.

use crate::client::error::{ClientError, ClientResult};
use crate::client::pool::AgentPool;
use crate::client::sequencer::GroupSequencer;
use crate::client::traits::QueueTransport;
use crate::core::retry::{retry_async, RetryPolicy};
use crate::queue::{Message, QueueOptionsPatch};
use crate::wire::{Request, WireResponse, FAILURE};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::error::Error as StdError;
use std::time::Duration;

/// Environment variable overriding the default broker port
pub const PORT_ENV: &str = "MEMSQS_PORT";

pub const DEFAULT_PORT: u16 = 80;

/// Port from `MEMSQS_PORT`, or 80 when unset, zero or invalid
pub fn default_port() -> u16 {
    std::env::var(PORT_ENV)
        .ok()
        .and_then(|port| port.parse::<u16>().ok())
        .filter(|port| *port != 0)
        .unwrap_or(DEFAULT_PORT)
}

pub fn default_server_url() -> String {
    format!("http://localhost:{}", default_port())
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Broker endpoint, e.g. `http://localhost:8080`
    pub url: String,
    pub retry: RetryPolicy,
    /// Per-attempt limit; must exceed the broker's long-poll window
    pub request_timeout: Option<Duration>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            retry: RetryPolicy::default(),
            request_timeout: Some(Duration::from_secs(60)),
        }
    }
}

/// Wire protocol client
///
/// # Example
///
/// ```rust,no_run
/// use memsqs::client::{HttpClient, QueueTransport};
/// use memsqs::queue::Message;
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new("http://localhost:8080");
/// client.send("jobs", Message::new("m1", "g1", json!({"n": 1}))).await?;
///
/// for message in client.receive("jobs", "worker-1").await? {
///     client.remove("jobs", &message).await?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HttpClient {
    url: String,
    retry: RetryPolicy,
    pool: AgentPool,
    sequencer: GroupSequencer,
}

impl HttpClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_config(HttpClientConfig {
            url: url.into(),
            ..HttpClientConfig::default()
        })
    }

    pub fn with_config(config: HttpClientConfig) -> Self {
        Self {
            url: config.url,
            retry: config.retry,
            pool: AgentPool::new(config.request_timeout),
            sequencer: GroupSequencer::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn pool(&self) -> &AgentPool {
        &self.pool
    }

    async fn call(&self, request: &Request) -> ClientResult<WireResponse> {
        let body = serde_json::to_vec(&request.to_envelope()?)?;
        let agent = self.pool.checkout()?;
        let operation = request.api().to_string();

        retry_async(
            &operation,
            self.retry.clone(),
            ClientError::is_retryable,
            || self.post_once(&agent, &body),
        )
        .await
    }

    async fn post_once(&self, agent: &reqwest::Client, body: &[u8]) -> ClientResult<WireResponse> {
        let response = agent
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json; charset=UTF-8")
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status == StatusCode::BAD_GATEWAY || status == StatusCode::GATEWAY_TIMEOUT {
            return Err(ClientError::Gateway {
                status: status.as_u16(),
            });
        }
        if status != StatusCode::OK {
            return Err(ClientError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        let envelope: WireResponse = serde_json::from_slice(&bytes)?;
        if !envelope.is_ok() {
            let message = envelope.error.unwrap_or_else(|| FAILURE.to_string());
            log::debug!("Server reported {} for {}", message, self.url);
            return Err(ClientError::Server { message });
        }
        Ok(envelope)
    }

    fn classify(&self, error: reqwest::Error) -> ClientError {
        if is_connection_refused(&error) {
            log::debug!("Connection to {} refused, failing without retry", self.url);
            ClientError::ConnectionRefused {
                url: self.url.clone(),
                source: error,
            }
        } else {
            ClientError::Transport(error)
        }
    }
}

fn is_connection_refused(error: &reqwest::Error) -> bool {
    if !error.is_connect() {
        return false;
    }
    let mut source = error.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

#[async_trait]
impl QueueTransport for HttpClient {
    async fn set_options(&self, queue_id: &str, options: &QueueOptionsPatch) -> ClientResult<()> {
        self.call(&Request::SetOptions {
            queue_id: queue_id.to_string(),
            options: options.clone(),
        })
        .await
        .map(|_| ())
    }

    async fn claim(&self, queue_id: &str, owner: &str, group_id: &str) -> ClientResult<()> {
        self.call(&Request::Claim {
            queue_id: queue_id.to_string(),
            owner: owner.to_string(),
            group_id: group_id.to_string(),
        })
        .await
        .map(|_| ())
    }

    async fn send(&self, queue_id: &str, message: Message) -> ClientResult<()> {
        let _turn = self
            .sequencer
            .acquire(queue_id, message.effective_group())
            .await;
        let request = Request::Send {
            queue_id: queue_id.to_string(),
            message: message.clone(),
        };
        match self.call(&request).await {
            Ok(_) => Ok(()),
            Err(reason) => {
                log::warn!("Send of {} to {} failed: {}", message.id, queue_id, reason);
                Err(ClientError::undelivered(message, reason))
            }
        }
    }

    async fn receive(&self, queue_id: &str, owner: &str) -> ClientResult<Vec<Message>> {
        let response = self
            .call(&Request::Receive {
                queue_id: queue_id.to_string(),
                owner: owner.to_string(),
            })
            .await?;
        Ok(response.messages()?)
    }

    async fn remove(&self, queue_id: &str, message: &Message) -> ClientResult<()> {
        self.call(&Request::Remove {
            queue_id: queue_id.to_string(),
            message: message.reference(),
        })
        .await
        .map(|_| ())
    }
}
