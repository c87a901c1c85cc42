//! shardchain node: ties the ledger, shard schedule and consensus into one
//! service object.
//!
//! The node is the place where:
//! - Writes are authorized against the shard leader schedule
//! - Writes the node cannot perform are forwarded to the active leader
//! - The full chain is reassembled from micronode fragments
//! - Consensus rounds run and adopted chains are redistributed

pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod parallel_fetcher;
pub mod shard;
pub mod shutdown;
pub mod tracing_spans;

pub use config::NodeConfig;
pub use coordinator::{
    DistributionReport, FragmentReport, NodeDistribution, ShardCoordinator, StepOutcome,
};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::{ChainNode, ResolveOutcome, MINING_REWARD, REWARD_SENDER};
pub use parallel_fetcher::{FetchError, ParallelFetcher, DEFAULT_FETCH_WORKERS};
pub use shard::{Micronode, ShardSchedule};
pub use shutdown::ShutdownController;
