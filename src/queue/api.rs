//! Public API for the queue engine
//!
//! External modules should import from here rather than directly from
//! internal modules.

// Engine entry point
pub use crate::queue::manager::QueueManager;

// Message types
pub use crate::queue::message::{Message, BROADCAST_GROUP};

// Options
pub use crate::queue::options::{QueueOptions, QueueOptionsPatch};

// Error handling
pub use crate::queue::error::{QueueError, QueueResult};

// Snapshots and reports
pub use crate::queue::types::{BrokerStats, QueueSnapshot, SweepReport};
