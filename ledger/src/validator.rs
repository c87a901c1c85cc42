//! Structural and proof-of-work validation of whole chains.

use shardchain_types::Block;
use shardchain_work::valid_proof;

use crate::store::hash;
use crate::LedgerError;

/// Check every link of `chain`, reporting the first broken one.
///
/// Chains of length 0 or 1 are vacuously valid.
pub fn check_chain(chain: &[Block]) -> Result<(), LedgerError> {
    for pair in chain.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        let prev_hash = hash(prev);

        if cur.previous_hash != prev_hash {
            return Err(LedgerError::ChainInvalid {
                index: cur.index,
                reason: format!(
                    "previous_hash {} does not match hash of predecessor {}",
                    cur.previous_hash, prev_hash
                ),
            });
        }

        if !valid_proof(prev.proof, cur.proof, &prev_hash) {
            return Err(LedgerError::ChainInvalid {
                index: cur.index,
                reason: format!("proof {} does not satisfy the work puzzle", cur.proof),
            });
        }
    }
    Ok(())
}

/// `true` iff [`check_chain`] finds no broken link.
pub fn validate_chain(chain: &[Block]) -> bool {
    match check_chain(chain) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "chain rejected");
            false
        }
    }
}
