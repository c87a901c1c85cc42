//! Networking layer for shardchain.
//!
//! - [`peer_registry`]: the set of known peer locations.
//! - [`client`]: the abstract interface every peer call goes through.
//! - [`http_client`]: the reqwest implementation used by the daemon.
//! - [`wire`]: request/response payloads and route paths shared with the
//!   RPC server.

pub mod client;
pub mod error;
pub mod http_client;
pub mod peer_registry;
pub mod wire;

pub use client::PeerClient;
pub use error::NetworkError;
pub use http_client::HttpPeerClient;
pub use peer_registry::{normalize_address, PeerRegistry};
pub use wire::{
    AppendRequest, ChainResponse, ForwardedTransaction, IdResponse, IndexResponse, SealRequest,
    ShardView,
};
