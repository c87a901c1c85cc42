//! Block hash type and the SHA-256 helper behind it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Predecessor hash recorded in the genesis block.
pub const SEED_HASH: &str = "1";

/// Hex-encoded SHA-256 digest of a block.
///
/// Stored as a string rather than a byte array because the genesis block
/// links to [`SEED_HASH`], which is not a digest.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHash(String);

impl BlockHash {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The predecessor hash of every genesis block.
    pub fn seed() -> Self {
        Self(SEED_HASH.to_string())
    }

    pub fn is_seed(&self) -> bool {
        self.0 == SEED_HASH
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hash arbitrary bytes into a `BlockHash`.
    pub fn digest(bytes: &[u8]) -> Self {
        Self(sha256_hex(bytes))
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.0.get(..8).unwrap_or(&self.0);
        write!(f, "BlockHash({short}\u{2026})")
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase hex SHA-256 digest of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
