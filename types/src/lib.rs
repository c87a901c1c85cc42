//! Fundamental types for shardchain.
//!
//! This crate defines the records shared across every other crate in the
//! workspace: transactions, blocks and their canonical hash, the opaque
//! node identity, and timestamps.

pub mod block;
pub mod error;
pub mod hash;
pub mod node_id;
pub mod time;
pub mod transaction;

pub use block::{Block, SEED_PROOF};
pub use error::TypesError;
pub use hash::{sha256_hex, BlockHash, SEED_HASH};
pub use node_id::NodeId;
pub use time::Timestamp;
pub use transaction::Transaction;

/// An ordered sequence of blocks, index 0 being the genesis block.
pub type Chain = Vec<Block>;
