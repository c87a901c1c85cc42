//! Nullable infrastructure for deterministic testing.
//!
//! Everything a node does over the network goes through
//! [`shardchain_network::PeerClient`]. This crate provides a test-friendly
//! implementation that:
//! - Serves chains, fragments and identities programmed by the test
//! - Records every write it receives
//! - Never opens a socket
//!
//! It also provides fixture chains with real proofs of work.

pub mod fixtures;
pub mod peer_client;

pub use fixtures::{mined_chain, tampered};
pub use peer_client::NullPeerClient;
