//! HTTP/JSON server for a shardchain node.
//!
//! Provides endpoints for:
//! - Mining and transaction submission
//! - Full-chain and local-fragment reads
//! - Peer and micronode registration
//! - Consensus resolution
//! - Writes forwarded between micronodes
//! - Prometheus metrics

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use server::{router, RpcServer};
