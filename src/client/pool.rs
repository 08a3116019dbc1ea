//! Agent pool
//!
//! An agent is a keep-alive HTTP client limited to one idle connection. Each
//! call checks one out for its whole duration, retries included, and the
//! guard hands it back when dropped.

use crate::client::error::ClientResult;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug)]
pub struct AgentPool {
    idle: Mutex<Vec<reqwest::Client>>,
    created: AtomicUsize,
    request_timeout: Option<Duration>,
}

impl AgentPool {
    /// Pool whose agents give up on a request after `request_timeout`
    pub fn new(request_timeout: Option<Duration>) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            created: AtomicUsize::new(0),
            request_timeout,
        }
    }

    fn build_agent(&self) -> ClientResult<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(1)
            .tcp_keepalive(Duration::from_secs(60));
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        let agent = builder.build()?;
        let created = self.created.fetch_add(1, Ordering::Relaxed) + 1;
        log::trace!("Agent pool grew to {} agents", created);
        Ok(agent)
    }

    /// Take an idle agent, or build a new one when all are in use
    pub fn checkout(&self) -> ClientResult<PooledAgent<'_>> {
        let idle = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        let agent = match idle {
            Some(agent) => agent,
            None => self.build_agent()?,
        };
        Ok(PooledAgent { agent, pool: self })
    }

    fn checkin(&self, agent: reqwest::Client) {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(agent);
    }

    /// Agents ever created
    pub fn size(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    pub fn idle_count(&self) -> usize {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn in_use(&self) -> usize {
        self.size().saturating_sub(self.idle_count())
    }
}

/// Exclusive use of one agent; returned to the pool on drop
#[derive(Debug)]
pub struct PooledAgent<'a> {
    agent: reqwest::Client,
    pool: &'a AgentPool,
}

impl Deref for PooledAgent<'_> {
    type Target = reqwest::Client;

    fn deref(&self) -> &reqwest::Client {
        &self.agent
    }
}

impl Drop for PooledAgent<'_> {
    fn drop(&mut self) {
        // Clients are handles onto shared connection state
        self.pool.checkin(self.agent.clone());
    }
}
