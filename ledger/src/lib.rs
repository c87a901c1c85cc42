//! Block chain ledger.
//!
//! A node's chain is an append-only sequence of blocks starting at genesis.
//! The [`LedgerStore`] owns the chain and the buffer of pending transactions;
//! [`validator`] checks arbitrary chains received from peers before they are
//! allowed to replace local state.

pub mod error;
pub mod genesis;
pub mod store;
pub mod validator;

pub use error::LedgerError;
pub use genesis::create_genesis_block;
pub use store::{hash, LedgerStore};
pub use validator::{check_chain, validate_chain};
