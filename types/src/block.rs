//! Blocks of the ledger and their canonical hash.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::hash::BlockHash;
use crate::time::Timestamp;
use crate::transaction::Transaction;

/// Proof recorded in the genesis block.
pub const SEED_PROOF: u64 = 100;

/// One sealed ledger entry.
///
/// `index` is the 1-based position of the block in the global chain
/// (genesis = 1). `transactions` is a snapshot of the pending buffer taken
/// when the block was sealed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: Timestamp,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: BlockHash,
}

impl Block {
    /// The first block of every chain.
    pub fn genesis(timestamp: Timestamp) -> Self {
        Self {
            index: 1,
            timestamp,
            transactions: Vec::new(),
            proof: SEED_PROOF,
            previous_hash: BlockHash::seed(),
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.previous_hash.is_seed() && self.proof == SEED_PROOF
    }

    /// JSON object with keys sorted at every level.
    ///
    /// Keys are inserted in lexicographic order so the encoding does not
    /// depend on whether `serde_json` keeps insertion order or sorts.
    pub fn canonical_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("index".into(), Value::from(self.index));
        object.insert(
            "previous_hash".into(),
            Value::from(self.previous_hash.as_str().to_string()),
        );
        object.insert("proof".into(), Value::from(self.proof));
        object.insert("timestamp".into(), Value::from(self.timestamp.as_secs()));
        object.insert(
            "transactions".into(),
            Value::Array(
                self.transactions
                    .iter()
                    .map(Transaction::canonical_json)
                    .collect(),
            ),
        );
        Value::Object(object)
    }

    /// Compact canonical encoding fed to the hash function.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        self.canonical_json().to_string().into_bytes()
    }

    /// SHA-256 of the canonical encoding, hex encoded.
    pub fn compute_hash(&self) -> BlockHash {
        BlockHash::digest(&self.canonical_bytes())
    }
}
