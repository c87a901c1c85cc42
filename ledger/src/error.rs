use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("chain is empty and no previous hash was supplied")]
    EmptyChain,

    #[error("invalid chain at block {index}: {reason}")]
    ChainInvalid { index: u64, reason: String },
}
