//! Consensus: naive longest-chain resolution.
//!
//! A node asks every registered peer for its chain and adopts the longest
//! one that passes structural validation. There is no voting weight and no
//! finality: a longer valid chain always wins.
//!
//! ## Module overview
//!
//! - [`resolver`]: the peer scan and adoption rule.

pub mod resolver;

pub use resolver::{ConsensusResolver, PeerReport, PeerVote, Resolution};
