//! Errors raised while constructing fundamental types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("invalid node id: {0}")]
    InvalidNodeId(String),

    #[error("system randomness unavailable: {0}")]
    Randomness(String),
}
