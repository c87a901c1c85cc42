//! Abstract peer client.
//!
//! Consensus and shard coordination never talk to the network directly;
//! every call goes through [`PeerClient`] so tests can substitute an
//! in-memory implementation.
//!
//! The trait is object safe and used as `Arc<dyn PeerClient>`.

use async_trait::async_trait;

use shardchain_types::{Block, NodeId};

use crate::wire::{ChainResponse, ForwardedTransaction, SealRequest};
use crate::NetworkError;

/// Calls one node makes on another, addressed by `host:port`.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Ask a node for its identity.
    async fn fetch_identity(&self, peer: &str) -> Result<NodeId, NetworkError>;

    /// Fetch the node's full (assembled) chain, used for consensus.
    async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse, NetworkError>;

    /// Fetch only the blocks the node stores locally (its shard fragments).
    async fn fetch_fragment(&self, peer: &str) -> Result<Vec<Block>, NetworkError>;

    /// Empty the node's local chain.
    async fn clear_chain(&self, peer: &str) -> Result<(), NetworkError>;

    /// Append `blocks` to the node's local chain, in order.
    async fn post_fragment(&self, peer: &str, blocks: &[Block]) -> Result<(), NetworkError>;

    /// Ask the active leader to seal and append a block.
    async fn forward_seal(&self, peer: &str, request: &SealRequest)
        -> Result<Block, NetworkError>;

    /// Ask the active leader to buffer a transaction.
    async fn forward_transaction(
        &self,
        peer: &str,
        request: &ForwardedTransaction,
    ) -> Result<u64, NetworkError>;
}
