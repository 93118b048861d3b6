//! Transaction record shape consumed from the wallet core.
//!
//! The wallet core reports transactions through the foreign-function boundary
//! as normalized records; the ledger stores them verbatim. A record is mutable
//! while pending (the core keeps reporting confirmation progress) and
//! conceptually immutable once it reaches a terminal status.

use crate::amount::MicroAmount;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque transaction identifier, unique across the live record set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(pub String);

impl TxId {
    pub fn new(id: impl Into<String>) -> Self {
        TxId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TxId {
    fn from(s: &str) -> Self {
        TxId(s.to_string())
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transfer direction relative to this wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxDirection {
    Inbound,
    Outbound,
}

impl TxDirection {
    pub fn label(self) -> &'static str {
        match self {
            TxDirection::Inbound => "inbound",
            TxDirection::Outbound => "outbound",
        }
    }
}

/// Transaction lifecycle status.
///
/// Coinbase and one-sided payments are attributes on the record, not
/// separate statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Completed,
    Cancelled,
    Failed,
}

impl TxStatus {
    /// Human-readable label, as shown in transaction history.
    pub fn label(self) -> &'static str {
        match self {
            TxStatus::Pending => "Pending",
            TxStatus::Completed => "Completed",
            TxStatus::Cancelled => "Cancelled",
            TxStatus::Failed => "Failed",
        }
    }

    /// Terminal statuses no longer change.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TxStatus::Pending)
    }

    pub const ALL: [TxStatus; 4] = [
        TxStatus::Pending,
        TxStatus::Completed,
        TxStatus::Cancelled,
        TxStatus::Failed,
    ];
}

/// One transaction's current known state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: TxId,
    pub direction: TxDirection,
    pub status: TxStatus,
    pub amount: MicroAmount,
    pub fee: MicroAmount,
    /// Counterparty address, format-agnostic at this layer.
    pub address: String,
    pub message: Option<String>,
    /// Observation time in milliseconds. Two records may share a timestamp;
    /// ties are broken by insertion order in the ledger.
    pub timestamp: u64,
    #[serde(default)]
    pub confirmations: u64,
    pub block_height: Option<u64>,
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub is_coinbase: bool,
    #[serde(default)]
    pub is_one_sided: bool,
}

impl TransactionRecord {
    /// Minimal record with the given id; the rest defaulted. Used heavily
    /// in tests and by the wallet-core feed before enrichment.
    pub fn new(
        id: impl Into<TxId>,
        direction: TxDirection,
        status: TxStatus,
        amount: MicroAmount,
        address: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        TransactionRecord {
            id: id.into(),
            direction,
            status,
            amount,
            fee: MicroAmount::ZERO,
            address: address.into(),
            message: None,
            timestamp,
            confirmations: 0,
            block_height: None,
            cancellation_reason: None,
            is_coinbase: false,
            is_one_sided: false,
        }
    }
}

impl From<String> for TxId {
    fn from(s: String) -> Self {
        TxId(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(TxStatus::Pending.label(), "Pending");
        assert_eq!(TxStatus::Failed.label(), "Failed");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TxStatus::Pending.is_terminal());
        assert!(TxStatus::Completed.is_terminal());
        assert!(TxStatus::Cancelled.is_terminal());
        assert!(TxStatus::Failed.is_terminal());
    }

    #[test]
    fn test_record_serde_roundtrip() {
        let rec = TransactionRecord::new(
            "t1",
            TxDirection::Inbound,
            TxStatus::Pending,
            MicroAmount(1_000_000),
            "addr_a",
            100,
        );
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"inbound\""));
        let back: TransactionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }
}
