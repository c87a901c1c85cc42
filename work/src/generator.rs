//! Proof search (single-threaded, sequential).

use std::sync::atomic::{AtomicBool, Ordering};

use shardchain_types::BlockHash;

use crate::validator::valid_proof;
use crate::WorkError;

/// Attempts between two reads of the cancellation flag.
pub const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// Find the smallest proof valid for the previous block.
///
/// Unbounded in the worst case. Callers on an async runtime should run it
/// under `spawn_blocking`.
pub fn solve(last_proof: u64, last_hash: &BlockHash) -> u64 {
    let mut proof = 0u64;
    while !valid_proof(last_proof, proof, last_hash) {
        proof += 1;
    }
    proof
}

/// Same scan as [`solve`], abandoned once `cancel` is raised.
pub fn solve_until(
    last_proof: u64,
    last_hash: &BlockHash,
    cancel: &AtomicBool,
) -> Result<u64, WorkError> {
    let mut proof = 0u64;
    loop {
        if proof % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
            return Err(WorkError::Cancelled { attempts: proof });
        }
        if valid_proof(last_proof, proof, last_hash) {
            return Ok(proof);
        }
        proof += 1;
    }
}
