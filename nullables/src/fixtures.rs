//! Deterministic fixture chains.

use shardchain_types::{Block, Timestamp, Transaction};
use shardchain_work::{solve, valid_proof};

/// A valid chain of `len` blocks (genesis included) with real proofs of
/// work. Timestamps equal block indices so the result is reproducible.
pub fn mined_chain(len: usize) -> Vec<Block> {
    let mut chain = Vec::with_capacity(len);
    if len == 0 {
        return chain;
    }
    chain.push(Block::genesis(Timestamp::new(1)));
    while chain.len() < len {
        let Some(last) = chain.last() else { break };
        let last_hash = last.compute_hash();
        let index = last.index + 1;
        let block = Block {
            index,
            timestamp: Timestamp::new(index),
            transactions: vec![Transaction::new("0", "fixture", 1)],
            proof: solve(last.proof, &last_hash),
            previous_hash: last_hash,
        };
        chain.push(block);
    }
    chain
}

/// Extend `chain` to `len` blocks whose links are well formed but whose
/// proofs are not, so the result fails validation.
pub fn tampered(mut chain: Vec<Block>, len: usize) -> Vec<Block> {
    while chain.len() < len {
        let Some(last) = chain.last() else { break };
        let index = last.index + 1;
        let last_hash = last.compute_hash();
        let proof = (0..)
            .find(|p| !valid_proof(last.proof, *p, &last_hash))
            .unwrap_or_default();
        let block = Block {
            index,
            timestamp: Timestamp::new(index),
            transactions: Vec::new(),
            proof,
            previous_hash: last_hash,
        };
        chain.push(block);
    }
    chain
}
