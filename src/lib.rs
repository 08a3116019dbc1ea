//! memsqs - an in-memory FIFO queue broker
//!
//! Messages are grouped; a group is leased to one consumer at a time and
//! delivered in send order. The broker is reachable through a JSON-over-HTTP
//! wire protocol ([`server`], [`client::HttpClient`]) or in-process
//! ([`client::LoopbackClient`]).

pub mod app;
pub mod blob;
pub mod broker;
pub mod client;
pub mod core;
pub mod queue;
pub mod server;
pub mod wire;
