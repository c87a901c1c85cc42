//! JSON payloads exchanged between nodes, and the routes that carry them.

use serde::{Deserialize, Serialize};

use shardchain_types::{Block, BlockHash, NodeId};

/// HTTP route paths served by every node.
pub mod routes {
    pub const MINE: &str = "/mine";
    pub const NEW_TRANSACTION: &str = "/transactions/new";
    pub const CHAIN: &str = "/chain";
    pub const LOCAL_CHAIN: &str = "/chain/local";
    pub const CLEAR_CHAIN: &str = "/chain/clear";
    pub const APPEND_CHAIN: &str = "/chain/append";
    pub const REGISTER_NODES: &str = "/nodes/register";
    pub const REGISTER_SUBNET: &str = "/nodes/register_subnet";
    pub const RESOLVE: &str = "/nodes/resolve";
    pub const IDENTITY: &str = "/id";
    pub const FORWARD_SEAL: &str = "/internal/seal";
    pub const FORWARD_TRANSACTION: &str = "/internal/transactions";
    pub const METRICS: &str = "/metrics";
}

/// A chain (or fragment) together with its length.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

impl ChainResponse {
    pub fn new(chain: Vec<Block>) -> Self {
        let length = chain.len();
        Self { chain, length }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdResponse {
    pub id: NodeId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppendRequest {
    pub blocks: Vec<Block>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexResponse {
    pub index: u64,
}

/// The coordinator's view of the shard schedule, attached to forwarded
/// writes so the receiving leader can catch up before acting.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardView {
    /// Leader slot per epoch, append-only.
    pub leaders: Vec<usize>,
    /// Highest global block index known to the coordinator.
    pub height: u64,
}

/// A seal request forwarded from the coordinator to the active leader.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SealRequest {
    pub proof: u64,
    #[serde(default)]
    pub previous_hash: Option<BlockHash>,
    pub view: ShardView,
}

/// A transaction forwarded from the coordinator to the active leader.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ForwardedTransaction {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
    pub view: ShardView,
}
