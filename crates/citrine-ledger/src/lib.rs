//! Citrine transaction ledger.
//!
//! Provides the multi-indexed in-memory transaction repository, query
//! normalization and presets, post-index filters with relevance-ranked
//! search, the cached history service, export, and the wallet-core event
//! feed adapter.

pub mod backend;
pub mod enrich;
pub mod error;
pub mod events;
pub mod export;
pub mod filters;
pub mod history;
pub mod query;
pub mod repository;

pub use backend::{
    apply_wallet_event, drive_feed, LedgerStore, NullStore, WalletCommands, WalletEvent,
};
pub use enrich::{enrich, EnrichedTransaction, LARGE_TX_MICRO};
pub use error::LedgerError;
pub use events::{LedgerEvent, RecordDiff, SubscriptionId};
pub use export::{ExportFormat, ExportResult};
pub use filters::{validate_filter, CustomPredicate, FilterReport, SearchHit, TagMatch};
pub use history::{
    HistoryConfig, HistoryFilter, HistoryPage, HistoryService, HistoryStatistics, SearchResults,
};
pub use query::{
    failed_txs, inbound_txs, large_transactions, last_7_days, pending_txs, QueryBuilder,
    QueryOptions, SortDirection, SortField, TransactionFilter, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use repository::{QueryPage, RepositoryConfig, RepositoryStats, TransactionRepository};

// Re-export the core value types for convenience.
pub use citrine_types::{MicroAmount, TransactionRecord, TxDirection, TxId, TxStatus};
