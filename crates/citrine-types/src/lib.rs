//! Core types for the Citrine wallet SDK.
//!
//! This crate provides the foundational types used across all Citrine crates:
//! transaction identifiers, micro-unit amounts, direction/status enums, and
//! the transaction record shape consumed from the wallet core.

pub mod amount;
pub mod transaction;

pub use amount::{MicroAmount, ParseAmountError};
pub use transaction::{TransactionRecord, TxDirection, TxId, TxStatus};
