//! Query normalization and filter presets.
//!
//! The query builder is a pure transform: it fills in defaults (page size,
//! sort field and direction), clamps the page size, and validates ranges, so
//! the repository and the history service can never disagree on defaults.
//! The preset factories mirror the filters users reach for most often, with
//! relative time windows computed against the clock at call time.

use crate::error::LedgerError;
use citrine_types::{MicroAmount, TransactionRecord, TxDirection, TxStatus};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 50;
/// Hard page-size cap; larger requests are clamped, not rejected.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Index-servable filter fields. All fields optional; `None` means
/// unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionFilter {
    pub status: Option<Vec<TxStatus>>,
    pub direction: Option<Vec<TxDirection>>,
    pub address: Option<String>,
    pub min_timestamp: Option<u64>,
    pub max_timestamp: Option<u64>,
    pub min_amount: Option<MicroAmount>,
    pub max_amount: Option<MicroAmount>,
}

impl TransactionFilter {
    pub fn is_empty(&self) -> bool {
        self == &TransactionFilter::default()
    }

    /// Linear residual predicate applied over index-narrowed candidates.
    pub fn matches(&self, record: &TransactionRecord) -> bool {
        if let Some(statuses) = &self.status {
            if !statuses.contains(&record.status) {
                return false;
            }
        }
        if let Some(directions) = &self.direction {
            if !directions.contains(&record.direction) {
                return false;
            }
        }
        if let Some(address) = &self.address {
            if record.address != *address {
                return false;
            }
        }
        if let Some(min) = self.min_timestamp {
            if record.timestamp < min {
                return false;
            }
        }
        if let Some(max) = self.max_timestamp {
            if record.timestamp > max {
                return false;
            }
        }
        if let Some(min) = self.min_amount {
            if record.amount < min {
                return false;
            }
        }
        if let Some(max) = self.max_amount {
            if record.amount > max {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Timestamp,
    Amount,
    Fee,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Caller-supplied pagination and sort request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryOptions {
    pub offset: usize,
    pub limit: Option<usize>,
    pub sort_by: Option<SortField>,
    pub sort_dir: Option<SortDirection>,
}

/// A filter + options pair with every default filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedQuery {
    pub filter: TransactionFilter,
    pub offset: usize,
    pub limit: usize,
    pub sort_by: SortField,
    pub sort_dir: SortDirection,
}

/// Pure, stateless query normalizer.
pub struct QueryBuilder;

impl QueryBuilder {
    pub fn normalize(
        filter: &TransactionFilter,
        options: &QueryOptions,
    ) -> Result<NormalizedQuery, LedgerError> {
        if let (Some(min), Some(max)) = (filter.min_timestamp, filter.max_timestamp) {
            if min > max {
                return Err(LedgerError::InvalidInput(format!(
                    "timestamp range inverted: {min} > {max}"
                )));
            }
        }
        if let (Some(min), Some(max)) = (filter.min_amount, filter.max_amount) {
            if min > max {
                return Err(LedgerError::InvalidInput(format!(
                    "amount range inverted: {} > {}",
                    min.as_micro(),
                    max.as_micro()
                )));
            }
        }

        let mut filter = filter.clone();
        // An empty status/direction list means "no constraint".
        if filter.status.as_deref() == Some(&[]) {
            filter.status = None;
        }
        if filter.direction.as_deref() == Some(&[]) {
            filter.direction = None;
        }

        Ok(NormalizedQuery {
            filter,
            offset: options.offset,
            limit: options.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            sort_by: options.sort_by.unwrap_or(SortField::Timestamp),
            sort_dir: options.sort_dir.unwrap_or(SortDirection::Desc),
        })
    }
}

// ─── Filter Presets ─────────────────────────────────────────────────────────

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

const DAY_MS: u64 = 24 * 60 * 60 * 1000;

/// Transactions from the last seven days, evaluated against the current clock.
pub fn last_7_days() -> TransactionFilter {
    last_7_days_at(now_millis())
}

pub(crate) fn last_7_days_at(now_ms: u64) -> TransactionFilter {
    TransactionFilter {
        min_timestamp: Some(now_ms.saturating_sub(7 * DAY_MS)),
        ..TransactionFilter::default()
    }
}

/// Transactions of at least 1,000 coins.
pub fn large_transactions() -> TransactionFilter {
    TransactionFilter {
        min_amount: Some(MicroAmount::from_coins(1_000)),
        ..TransactionFilter::default()
    }
}

/// Failed transactions.
pub fn failed_txs() -> TransactionFilter {
    TransactionFilter {
        status: Some(vec![TxStatus::Failed]),
        ..TransactionFilter::default()
    }
}

/// Pending transactions.
pub fn pending_txs() -> TransactionFilter {
    TransactionFilter {
        status: Some(vec![TxStatus::Pending]),
        ..TransactionFilter::default()
    }
}

/// Inbound transactions.
pub fn inbound_txs() -> TransactionFilter {
    TransactionFilter {
        direction: Some(vec![TxDirection::Inbound]),
        ..TransactionFilter::default()
    }
}
