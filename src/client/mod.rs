//! Client side of the wire protocol
//!
//! [`HttpClient`] talks to a remote broker, [`LoopbackClient`] to one in the
//! same process, and [`OffloadingTransport`] wraps either to move oversized
//! payloads into a blob store. All of them implement [`QueueTransport`].

mod error;
mod http;
mod loopback;
mod offload;
mod pool;
mod sequencer;
mod traits;

pub use error::{ClientError, ClientResult};
pub use http::{default_port, default_server_url, HttpClient, HttpClientConfig, DEFAULT_PORT, PORT_ENV};
pub use loopback::LoopbackClient;
pub use offload::{OffloadingTransport, DEFAULT_MAXIMUM_MESSAGE_SIZE, ENVELOPE_HEADROOM};
pub use pool::{AgentPool, PooledAgent};
pub use sequencer::{GroupSequencer, LaneTurn};
pub use traits::QueueTransport;
