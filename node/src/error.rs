use thiserror::Error;

use shardchain_types::NodeId;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] shardchain_ledger::LedgerError),

    #[error("network error: {0}")]
    Network(#[from] shardchain_network::NetworkError),

    #[error("types error: {0}")]
    Types(#[from] shardchain_types::TypesError),

    #[error("work error: {0}")]
    Work(#[from] shardchain_work::WorkError),

    /// The local node may neither seal nor forward writes right now.
    #[error("node {node} is not the active leader")]
    NotLeader { node: NodeId },

    /// The local node is not among the micronodes being registered.
    #[error("node {node} is not included in the subnet")]
    NotInSubnet { node: NodeId },

    /// A fragment needed for assembly could not be fetched.
    #[error("fragment from {peer} unavailable: {reason}")]
    FragmentUnavailable { peer: String, reason: String },

    /// The fragments fetched do not cover the leader schedule.
    #[error("shard fragments inconsistent: {0}")]
    InconsistentShards(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("task failed: {0}")]
    Task(String),
}
