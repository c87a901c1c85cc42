//! Opaque per-process node identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Number of random bytes behind a generated identity.
const NODE_ID_BYTES: usize = 16;

/// Identifier generated once per process lifetime.
///
/// Only ever compared for equality; it carries no key material.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Draw a fresh identity from the OS random source.
    pub fn generate() -> Result<Self, TypesError> {
        let mut bytes = [0u8; NODE_ID_BYTES];
        getrandom::getrandom(&mut bytes).map_err(|e| TypesError::Randomness(e.to_string()))?;
        Ok(Self(hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for NodeId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(TypesError::InvalidNodeId(s.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_hex_and_distinct() {
        let a = NodeId::generate().unwrap();
        let b = NodeId::generate().unwrap();
        assert_eq!(a.as_str().len(), NODE_ID_BYTES * 2);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn parse_rejects_blank() {
        assert!("".parse::<NodeId>().is_err());
        assert!("   ".parse::<NodeId>().is_err());
        assert!("a b".parse::<NodeId>().is_err());
        assert_eq!("node-a".parse::<NodeId>().unwrap().as_str(), "node-a");
    }
}
