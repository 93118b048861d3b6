//! Repository mutation events and the subscription registry.
//!
//! Listeners receive events synchronously, strictly after the repository's
//! indices are consistent with the mutation, so a handler always observes a
//! repository that already reflects the event it was handed.

use citrine_types::{TransactionRecord, TxId, TxStatus};
use serde::Serialize;

/// Fields that changed between the previous and the new version of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDiff {
    /// (previous, new) confirmation counts, when changed.
    pub confirmations: Option<(u64, u64)>,
    /// (previous, new) block heights, when changed.
    pub block_height: Option<(Option<u64>, Option<u64>)>,
    /// New cancellation reason, when one appeared or changed.
    pub cancellation_reason: Option<String>,
}

impl RecordDiff {
    pub fn between(old: &TransactionRecord, new: &TransactionRecord) -> Self {
        RecordDiff {
            confirmations: (old.confirmations != new.confirmations)
                .then_some((old.confirmations, new.confirmations)),
            block_height: (old.block_height != new.block_height)
                .then_some((old.block_height, new.block_height)),
            cancellation_reason: if old.cancellation_reason != new.cancellation_reason {
                new.cancellation_reason.clone()
            } else {
                None
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.confirmations.is_none()
            && self.block_height.is_none()
            && self.cancellation_reason.is_none()
    }
}

/// Repository mutation events.
#[derive(Debug, Clone)]
pub enum LedgerEvent {
    /// A new record was inserted.
    Added(TransactionRecord),
    /// An existing record was replaced.
    Updated {
        record: TransactionRecord,
        previous_status: TxStatus,
        new_status: TxStatus,
        diff: RecordDiff,
    },
    /// A record left the live set (explicit removal, eviction, or clear).
    Removed(TxId),
}

/// Handle returned by [`Subscribers::subscribe`]; pass it back to
/// `unsubscribe` to detach.
pub type SubscriptionId = u64;

type Handler = Box<dyn Fn(&LedgerEvent) + Send + Sync>;

/// Typed observer registry: subscribe returns an id, unsubscribe detaches it.
/// Delivery is synchronous, in subscription order, at-least-once per event
/// to every currently attached handler.
#[derive(Default)]
pub struct Subscribers {
    next_id: SubscriptionId,
    handlers: Vec<(SubscriptionId, Handler)>,
}

impl Subscribers {
    pub fn subscribe(&mut self, handler: impl Fn(&LedgerEvent) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Detach a handler. Returns false if the id was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(h, _)| *h != id);
        self.handlers.len() != before
    }

    pub fn emit(&self, event: &LedgerEvent) {
        for (_, handler) in &self.handlers {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
