//! Proof-of-work for sealing blocks.
//!
//! A proof `p'` is valid for the previous block `(p, h)` when the SHA-256
//! hex digest of `"{p},{p'},{h}"` starts with [`DIFFICULTY_PREFIX`].
//! Difficulty is fixed; the search is a plain sequential scan so that the
//! smallest valid proof is always the one found.

pub mod error;
pub mod generator;
pub mod validator;

pub use error::WorkError;
pub use generator::{solve, solve_until, CANCEL_CHECK_INTERVAL};
pub use validator::{valid_proof, DIFFICULTY_PREFIX};
