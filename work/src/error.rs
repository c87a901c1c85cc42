use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkError {
    #[error("proof search cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },
}
