//! Genesis block creation.
//!
//! Every node creates its own genesis block on start-up. It links to the
//! fixed seed hash and carries the fixed seed proof, so the first real block
//! can be mined against it like against any other block.

use shardchain_types::{Block, Timestamp};

/// Create the genesis block stamped with the current time.
pub fn create_genesis_block() -> Block {
    Block::genesis(Timestamp::now())
}
