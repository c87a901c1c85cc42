//! Registry of known peers.
//!
//! Peers are stored as normalized `host:port` strings. The registry is a
//! set: registering an address twice is a no-op. Iteration is sorted so
//! every consensus scan visits peers in the same order.

use std::collections::BTreeSet;

use crate::NetworkError;

/// Reduce a user-supplied peer address to its `host:port` network location.
///
/// - `http://192.168.0.5:5000/` → `192.168.0.5:5000` (network location)
/// - `//192.168.0.5:5000` → `192.168.0.5:5000`
/// - `192.168.0.5:5000` → kept as-is (bare path)
/// - anything without a location or path → [`NetworkError::InvalidAddress`]
pub fn normalize_address(address: &str) -> Result<String, NetworkError> {
    let trimmed = address.trim();
    let invalid = || NetworkError::InvalidAddress(address.to_string());

    let location = match trimmed.split_once("://") {
        Some((_scheme, rest)) => Some(rest),
        None => trimmed.strip_prefix("//"),
    };

    let normalized = match location {
        Some(rest) => rest
            .split(|c| matches!(c, '/' | '?' | '#'))
            .next()
            .unwrap_or_default(),
        None => trimmed.trim_end_matches('/'),
    };

    if normalized.is_empty() || normalized.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    Ok(normalized.to_string())
}

/// The set of peers this node exchanges chains with.
#[derive(Clone, Debug, Default)]
pub struct PeerRegistry {
    peers: BTreeSet<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize and add `address`. The registry is unchanged on error.
    ///
    /// Returns `true` if the peer was not known before.
    pub fn register(&mut self, address: &str) -> Result<bool, NetworkError> {
        let peer = normalize_address(address)?;
        let added = self.peers.insert(peer.clone());
        if added {
            tracing::debug!(%peer, "registered peer");
        }
        Ok(added)
    }

    pub fn contains(&self, address: &str) -> bool {
        normalize_address(address)
            .map(|peer| self.peers.contains(&peer))
            .unwrap_or(false)
    }

    /// Known peers in sorted order.
    pub fn peers(&self) -> Vec<String> {
        self.peers.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
