//! FIFO Queue Engine
//!
//! The broker's data model and leasing algorithm: queues hold groups, groups
//! hold an ordered backlog of messages and an optional lease.
//!
//! # Overview
//!
//! - **Groups**: the unit of ordering and ownership. Messages of one group
//!   are delivered in send order, and only to the consumer holding the
//!   group's lease.
//! - **Leases**: an owner string plus a deadline. Claiming or receiving
//!   refreshes the deadline; the sweep releases expired leases, which makes
//!   delivered-but-unremoved messages visible again.
//! - **Sequence numbers**: strictly increasing per queue, starting at 1.
//! - **Sweep**: releases leases, culls abandoned messages and empty groups,
//!   and discards idle empty queues.
//!
//! # Architecture
//!
//! ```text
//! QueueManager
//!  └─ Queue "jobs"  (options, sequence counter, held)
//!      ├─ Group "order-1"  lease: worker-a until t+30s
//!      │    backlog: [m1 pending] [m2 pending] [m3]
//!      └─ Group "order-2"  unleased
//!           backlog: [m4]
//! ```
//!
//! # Example Usage
//!
//! ```rust
//! use memsqs::queue::{Message, QueueError, QueueManager};
//! use serde_json::json;
//!
//! let mut manager = QueueManager::new();
//! manager.claim("jobs", "worker-a", "order-1").unwrap();
//! manager.send("jobs", Message::new("m1", "order-1", json!("pay"))).unwrap();
//!
//! // Another worker cannot take over a leased group
//! let conflict = manager.claim("jobs", "worker-b", "order-1").unwrap_err();
//! assert!(matches!(conflict, QueueError::OwnershipConflict { .. }));
//! assert!(manager.receive("jobs", "worker-b").is_empty());
//!
//! let batch = manager.receive("jobs", "worker-a");
//! assert_eq!(batch[0].id, "m1");
//! ```

pub mod api;
mod error;
mod group;
mod internal;
mod manager;
mod message;
mod options;
mod ordered;
mod types;

pub use error::{QueueError, QueueResult};
pub use manager::QueueManager;
pub use message::{Message, BROADCAST_GROUP};
pub use options::{QueueOptions, QueueOptionsPatch};
pub use ordered::OrderedMap;
pub use types::{BrokerStats, QueueSnapshot, SweepReport};

#[cfg(test)]
mod tests;
