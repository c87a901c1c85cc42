//! Nullable peer client: in-memory peers keyed by address.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use shardchain_network::{
    ChainResponse, ForwardedTransaction, NetworkError, PeerClient, SealRequest,
};
use shardchain_types::{Block, BlockHash, NodeId, Timestamp};

#[derive(Default)]
struct State {
    chains: HashMap<String, ChainResponse>,
    fragments: HashMap<String, Vec<Block>>,
    identities: HashMap<String, NodeId>,
    unreachable: HashSet<String>,
    rejecting: HashSet<String>,
    delays: HashMap<String, Duration>,

    clears: Vec<String>,
    posts: Vec<(String, Vec<Block>)>,
    seals: Vec<(String, SealRequest)>,
    transactions: Vec<(String, ForwardedTransaction)>,
}

/// A [`PeerClient`] whose peers live in memory.
///
/// Fragments are live state: `clear_chain` empties a peer's fragment and
/// `post_fragment` appends to it, so a distribution followed by an
/// assembly round-trips through this client.
#[derive(Default)]
pub struct NullPeerClient {
    state: Mutex<State>,
}

impl NullPeerClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Serve `chain` from `GET /chain` on `peer`.
    pub fn set_chain(&self, peer: &str, chain: Vec<Block>) {
        self.state()
            .chains
            .insert(peer.to_string(), ChainResponse::new(chain));
    }

    /// Serve `chain` with a `length` field that disagrees with it.
    pub fn set_chain_with_length(&self, peer: &str, chain: Vec<Block>, length: usize) {
        self.state()
            .chains
            .insert(peer.to_string(), ChainResponse { chain, length });
    }

    pub fn set_fragment(&self, peer: &str, blocks: Vec<Block>) {
        self.state().fragments.insert(peer.to_string(), blocks);
    }

    pub fn set_identity(&self, peer: &str, id: NodeId) {
        self.state().identities.insert(peer.to_string(), id);
    }

    /// Every call to `peer` fails as unreachable.
    pub fn set_unreachable(&self, peer: &str) {
        self.state().unreachable.insert(peer.to_string());
    }

    /// Forwarded writes to `peer` are refused as "not the leader".
    pub fn set_rejecting(&self, peer: &str) {
        self.state().rejecting.insert(peer.to_string());
    }

    /// Delay every response from `peer`.
    pub fn set_delay(&self, peer: &str, delay: Duration) {
        self.state().delays.insert(peer.to_string(), delay);
    }

    pub fn fragment(&self, peer: &str) -> Vec<Block> {
        self.state().fragments.get(peer).cloned().unwrap_or_default()
    }

    /// Peers that received a clear, in call order.
    pub fn clears(&self) -> Vec<String> {
        self.state().clears.clone()
    }

    /// Fragments posted, in call order.
    pub fn posts(&self) -> Vec<(String, Vec<Block>)> {
        self.state().posts.clone()
    }

    pub fn forwarded_seals(&self) -> Vec<(String, SealRequest)> {
        self.state().seals.clone()
    }

    pub fn forwarded_transactions(&self) -> Vec<(String, ForwardedTransaction)> {
        self.state().transactions.clone()
    }

    /// Apply the configured delay and failure for `peer`.
    async fn enter(&self, peer: &str) -> Result<(), NetworkError> {
        let delay = self.state().delays.get(peer).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.state().unreachable.contains(peer) {
            return Err(NetworkError::PeerUnreachable {
                peer: peer.to_string(),
                reason: "connection refused (null client)".to_string(),
            });
        }
        Ok(())
    }

    fn not_found(peer: &str) -> NetworkError {
        NetworkError::Status {
            peer: peer.to_string(),
            status: 404,
        }
    }

    fn check_leader(&self, peer: &str) -> Result<(), NetworkError> {
        if self.state().rejecting.contains(peer) {
            return Err(NetworkError::LeaderRejected {
                peer: peer.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PeerClient for NullPeerClient {
    async fn fetch_identity(&self, peer: &str) -> Result<NodeId, NetworkError> {
        self.enter(peer).await?;
        self.state()
            .identities
            .get(peer)
            .cloned()
            .ok_or_else(|| Self::not_found(peer))
    }

    async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse, NetworkError> {
        self.enter(peer).await?;
        self.state()
            .chains
            .get(peer)
            .cloned()
            .ok_or_else(|| Self::not_found(peer))
    }

    async fn fetch_fragment(&self, peer: &str) -> Result<Vec<Block>, NetworkError> {
        self.enter(peer).await?;
        Ok(self.fragment(peer))
    }

    async fn clear_chain(&self, peer: &str) -> Result<(), NetworkError> {
        self.enter(peer).await?;
        let mut state = self.state();
        state.clears.push(peer.to_string());
        state.fragments.insert(peer.to_string(), Vec::new());
        Ok(())
    }

    async fn post_fragment(&self, peer: &str, blocks: &[Block]) -> Result<(), NetworkError> {
        self.enter(peer).await?;
        let mut state = self.state();
        state.posts.push((peer.to_string(), blocks.to_vec()));
        state
            .fragments
            .entry(peer.to_string())
            .or_default()
            .extend_from_slice(blocks);
        Ok(())
    }

    /// Answers like a leader that seals an empty block at the next
    /// global index.
    async fn forward_seal(
        &self,
        peer: &str,
        request: &SealRequest,
    ) -> Result<Block, NetworkError> {
        self.enter(peer).await?;
        self.check_leader(peer)?;
        let mut state = self.state();
        state.seals.push((peer.to_string(), request.clone()));
        let index = request.view.height + 1;
        let block = Block {
            index,
            timestamp: Timestamp::new(index),
            transactions: Vec::new(),
            proof: request.proof,
            previous_hash: request.previous_hash.clone().unwrap_or_else(BlockHash::seed),
        };
        state
            .fragments
            .entry(peer.to_string())
            .or_default()
            .push(block.clone());
        Ok(block)
    }

    async fn forward_transaction(
        &self,
        peer: &str,
        request: &ForwardedTransaction,
    ) -> Result<u64, NetworkError> {
        self.enter(peer).await?;
        self.check_leader(peer)?;
        self.state()
            .transactions
            .push((peer.to_string(), request.clone()));
        Ok(request.view.height + 1)
    }
}
