//! Ledger error types.

use citrine_types::TxId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("transaction already exists: {0}")]
    AlreadyExists(TxId),

    #[error("transaction not found: {0}")]
    NotFound(TxId),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("history service is disposed")]
    Disposed,

    #[error("custom predicate failed: {0}")]
    Predicate(String),

    #[error("lock poisoned: {0}")]
    Lock(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("cache error: {0}")]
    Cache(#[from] citrine_cache::CacheError),
}
