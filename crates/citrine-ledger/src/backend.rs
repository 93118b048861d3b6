//! Wallet-core integration.
//!
//! The ledger does not talk to a node itself. Wallet core pushes
//! [`WalletEvent`]s describing discovered and progressing transactions;
//! [`drive_feed`] folds that stream into the repository. Outbound actions
//! the ledger needs from the wallet (cancellation, backfill) go through
//! the [`WalletCommands`] trait so callers can plug in their own backend.

use crate::error::LedgerError;
use crate::repository::TransactionRepository;
use async_trait::async_trait;
use citrine_types::{TransactionRecord, TxId, TxStatus};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Transaction lifecycle events emitted by wallet core.
#[derive(Debug, Clone)]
pub enum WalletEvent {
    /// A transaction was seen for the first time (mempool or scan).
    TransactionDiscovered(TransactionRecord),
    /// An already-known transaction gained confirmations or moved state.
    TransactionProgressed(TransactionRecord),
    /// A pending transaction was cancelled before confirmation.
    TransactionCancelled { id: TxId, reason: String },
}

/// Fold one wallet event into the repository.
///
/// Discovery and progress are both upserts: wallet core can replay events
/// after a rescan, so a `Discovered` for a known id degrades to an update
/// and a `Progressed` for an unknown id degrades to an insert.
pub fn apply_wallet_event(
    repo: &mut TransactionRepository,
    event: WalletEvent,
) -> Result<(), LedgerError> {
    match event {
        WalletEvent::TransactionDiscovered(record)
        | WalletEvent::TransactionProgressed(record) => {
            if repo.contains(&record.id) {
                repo.update(record)?;
            } else {
                repo.add(record)?;
            }
            Ok(())
        }
        WalletEvent::TransactionCancelled { id, reason } => {
            let Some(mut record) = repo.get(&id) else {
                // A cancel for an unknown id is stale replay, not an error.
                log::debug!("cancel for unknown transaction {id}, ignoring");
                return Ok(());
            };
            record.status = TxStatus::Cancelled;
            record.cancellation_reason = Some(reason);
            repo.update(record)?;
            Ok(())
        }
    }
}

/// Consume a wallet event feed until the sender side closes.
///
/// Each event is applied under its own lock acquisition so readers are
/// never starved by a long replay. Per-event failures are logged and
/// skipped; only a poisoned lock ends the loop early.
pub async fn drive_feed(
    repo: Arc<Mutex<TransactionRepository>>,
    mut feed: mpsc::Receiver<WalletEvent>,
) -> Result<(), LedgerError> {
    while let Some(event) = feed.recv().await {
        let mut guard = repo.lock().map_err(|e| LedgerError::Lock(e.to_string()))?;
        if let Err(e) = apply_wallet_event(&mut guard, event) {
            log::warn!("wallet event rejected: {e}");
        }
    }
    log::debug!("wallet event feed closed");
    Ok(())
}

/// Outbound commands the ledger issues to wallet core.
#[async_trait]
pub trait WalletCommands: Send + Sync {
    /// Request cancellation of a pending transaction. Completion is
    /// reported asynchronously via a `TransactionCancelled` event.
    async fn cancel_transaction(&self, id: &TxId, reason: &str) -> Result<(), LedgerError>;

    /// Backfill: fetch every transaction at or after `since_timestamp`.
    async fn fetch_transactions(
        &self,
        since_timestamp: u64,
    ) -> Result<Vec<TransactionRecord>, LedgerError>;
}

/// Persistence seam for the in-memory ledger. The default implementation
/// is a no-op; embedders that want a durable ledger supply their own.
pub trait LedgerStore: Send + Sync {
    fn load(&self) -> Result<Vec<TransactionRecord>, LedgerError> {
        Ok(Vec::new())
    }

    fn save(&self, _records: &[TransactionRecord]) -> Result<(), LedgerError> {
        Ok(())
    }
}

/// Store that keeps nothing. Useful for tests and ephemeral wallets.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl LedgerStore for NullStore {}
