use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("invalid peer address: {0:?}")]
    InvalidAddress(String),

    #[error("peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: String, reason: String },

    #[error("peer {peer} returned HTTP {status}")]
    Status { peer: String, status: u16 },

    #[error("peer {peer} refused the write: not the active leader")]
    LeaderRejected { peer: String },

    #[error("invalid response from {peer}: {reason}")]
    InvalidResponse { peer: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl NetworkError {
    /// Address of the peer the failed call was aimed at, if any.
    pub fn peer(&self) -> Option<&str> {
        match self {
            Self::PeerUnreachable { peer, .. }
            | Self::Status { peer, .. }
            | Self::LeaderRejected { peer }
            | Self::InvalidResponse { peer, .. } => Some(peer),
            Self::InvalidAddress(_) | Self::Client(_) => None,
        }
    }
}
