//! Read-time enrichment.
//!
//! Derived fields (`age`, `display_amount`, `status_label`, `tags`) are
//! computed fresh from the raw record and the current clock on every read.
//! They are never stored in the repository, so they cannot go stale there;
//! a cached page carries the enrichment of its cache-write instant.

use citrine_types::{MicroAmount, TransactionRecord};
use serde::Serialize;

const DAY_MS: u64 = 24 * 60 * 60 * 1000;

/// Amount at or above which a transaction is tagged "large".
pub const LARGE_TX_MICRO: MicroAmount = MicroAmount(1_000 * 1_000_000);

/// A transaction record plus its derived, read-time fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTransaction {
    #[serde(flatten)]
    pub record: TransactionRecord,
    /// Age relative to the enrichment clock, in milliseconds.
    pub age_ms: u64,
    pub display_amount: String,
    pub status_label: &'static str,
    pub tags: Vec<String>,
}

/// Derive the read-time view of a record against the given clock.
pub fn enrich(record: &TransactionRecord, now_ms: u64) -> EnrichedTransaction {
    let age_ms = now_ms.saturating_sub(record.timestamp);
    let mut tags = vec![
        record.direction.label().to_string(),
        record.status.label().to_ascii_lowercase(),
    ];
    if record.is_coinbase {
        tags.push("coinbase".to_string());
    }
    if record.is_one_sided {
        tags.push("one-sided".to_string());
    }
    if record.amount >= LARGE_TX_MICRO {
        tags.push("large".to_string());
    }
    if age_ms < DAY_MS {
        tags.push("recent".to_string());
    }

    EnrichedTransaction {
        age_ms,
        display_amount: record.amount.display_coins(),
        status_label: record.status.label(),
        tags,
        record: record.clone(),
    }
}

impl EnrichedTransaction {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
