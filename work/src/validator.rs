//! Proof validation.

use shardchain_types::{sha256_hex, BlockHash};

/// Leading hex characters every valid proof digest must start with.
pub const DIFFICULTY_PREFIX: &str = "0000";

/// Check `proof` against the previous block's proof and hash.
pub fn valid_proof(last_proof: u64, proof: u64, last_hash: &BlockHash) -> bool {
    let guess = format!("{last_proof},{proof},{last_hash}");
    sha256_hex(guess.as_bytes()).starts_with(DIFFICULTY_PREFIX)
}
