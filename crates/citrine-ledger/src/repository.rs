//! In-memory transaction repository.
//!
//! The single source of truth for what transactions exist and in what state.
//! Records are held in a primary map plus three id-set indices (status,
//! direction, address) and a time-ordered sequence; every mutation keeps all
//! of them consistent before any event is emitted. Callers wrap the
//! repository in `Arc<Mutex<_>>`, so each mutation is atomic with respect to
//! concurrent reads.

use crate::error::LedgerError;
use crate::events::{LedgerEvent, RecordDiff, Subscribers, SubscriptionId};
use crate::query::{NormalizedQuery, QueryBuilder, QueryOptions, SortDirection, SortField, TransactionFilter};
use citrine_types::{TransactionRecord, TxDirection, TxId, TxStatus};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Repository limits.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Live-record cap; reaching it triggers eviction before the next insert.
    pub capacity: usize,
    /// Fraction of the least-recently-accessed records evicted at capacity.
    pub evict_fraction: f64,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        RepositoryConfig {
            capacity: 10_000,
            evict_fraction: 0.1,
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage {
    pub records: Vec<TransactionRecord>,
    pub total_count: usize,
    pub has_more: bool,
    pub next_offset: Option<usize>,
}

/// Aggregate counts maintained by the indices; no scan beyond them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStats {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub failed: usize,
    pub inbound: usize,
    pub outbound: usize,
    pub ordered_len: usize,
    pub earliest_timestamp: Option<u64>,
    pub latest_timestamp: Option<u64>,
}

/// Entry in the time-ordered sequence, sorted by (timestamp, seq) where seq
/// is insertion order; the tie-break keeps the order total.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OrderedKey {
    timestamp: u64,
    seq: u64,
    id: TxId,
}

pub struct TransactionRepository {
    config: RepositoryConfig,
    records: HashMap<TxId, TransactionRecord>,
    by_status: HashMap<TxStatus, HashSet<TxId>>,
    by_direction: HashMap<TxDirection, HashSet<TxId>>,
    by_address: HashMap<String, HashSet<TxId>>,
    ordered: Vec<OrderedKey>,
    /// Insertion sequence per live id, used for ordering tie-breaks.
    seq_of: HashMap<TxId, u64>,
    next_seq: u64,
    /// Monotonic access stamps driving least-recently-accessed eviction.
    access: HashMap<TxId, u64>,
    next_access: u64,
    subscribers: Subscribers,
}

impl Default for TransactionRepository {
    fn default() -> Self {
        Self::new(RepositoryConfig::default())
    }
}

impl TransactionRepository {
    pub fn new(config: RepositoryConfig) -> Self {
        TransactionRepository {
            config,
            records: HashMap::new(),
            by_status: HashMap::new(),
            by_direction: HashMap::new(),
            by_address: HashMap::new(),
            ordered: Vec::new(),
            seq_of: HashMap::new(),
            next_seq: 0,
            access: HashMap::new(),
            next_access: 0,
            subscribers: Subscribers::default(),
        }
    }

    // ── Subscriptions ───────────────────────────────────────────────────

    /// Attach a mutation listener. Events are delivered synchronously,
    /// after the repository is already consistent with them.
    pub fn subscribe(
        &mut self,
        handler: impl Fn(&LedgerEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.subscribers.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    // ── Mutations ───────────────────────────────────────────────────────

    /// Insert a new record. Fails with `AlreadyExists` on a duplicate id,
    /// leaving the existing record and indices untouched. At capacity the
    /// least-recently-accessed fraction is evicted first.
    pub fn add(&mut self, record: TransactionRecord) -> Result<(), LedgerError> {
        if self.records.contains_key(&record.id) {
            return Err(LedgerError::AlreadyExists(record.id));
        }
        if self.records.len() >= self.config.capacity {
            self.evict_lru();
        }

        let id = record.id.clone();
        self.index_insert(&record);
        self.ordered_insert(record.timestamp, &id);
        self.touch(&id);
        self.records.insert(id.clone(), record.clone());
        log::debug!("ledger: added {id}");
        self.subscribers.emit(&LedgerEvent::Added(record));
        Ok(())
    }

    /// Replace an existing record. Fails with `NotFound` when the id is
    /// absent. Old index entries are retracted before the new ones go in,
    /// and the ordered sequence is repositioned only when the timestamp
    /// changed.
    pub fn update(&mut self, record: TransactionRecord) -> Result<(), LedgerError> {
        let old = match self.records.get(&record.id) {
            Some(old) => old.clone(),
            None => return Err(LedgerError::NotFound(record.id)),
        };

        self.index_retract(&old);
        self.index_insert(&record);
        if old.timestamp != record.timestamp {
            self.ordered_remove(old.timestamp, &old.id);
            self.ordered_insert(record.timestamp, &record.id);
        }
        let diff = RecordDiff::between(&old, &record);
        self.records.insert(record.id.clone(), record.clone());
        log::debug!(
            "ledger: updated {} ({:?} -> {:?})",
            record.id,
            old.status,
            record.status
        );
        self.subscribers.emit(&LedgerEvent::Updated {
            previous_status: old.status,
            new_status: record.status,
            diff,
            record,
        });
        Ok(())
    }

    /// Remove a record. Removing an absent id is a no-op, not an error.
    pub fn remove(&mut self, id: &TxId) -> Option<TransactionRecord> {
        let removed = self.retract(id)?;
        self.subscribers.emit(&LedgerEvent::Removed(id.clone()));
        Some(removed)
    }

    /// Empty the repository, emitting one `Removed` per record so dependent
    /// caches can tear down their own state.
    pub fn clear(&mut self) {
        let ids: Vec<TxId> = self.records.keys().cloned().collect();
        self.records.clear();
        self.by_status.clear();
        self.by_direction.clear();
        self.by_address.clear();
        self.ordered.clear();
        self.seq_of.clear();
        self.access.clear();
        for id in ids {
            self.subscribers.emit(&LedgerEvent::Removed(id));
        }
    }

    // ── Reads ───────────────────────────────────────────────────────────

    /// Point lookup. Absence is a normal outcome. Bumps the access stamp
    /// used by eviction.
    pub fn get(&mut self, id: &TxId) -> Option<TransactionRecord> {
        if !self.records.contains_key(id) {
            return None;
        }
        self.touch(id);
        self.records.get(id).cloned()
    }

    /// Membership check without touching the access stamp.
    pub fn contains(&self, id: &TxId) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index-narrowed query. Picks the single most selective index the
    /// filter allows (address, then status, then direction), applies the
    /// residual predicate linearly over those candidates only, sorts, and
    /// pages.
    pub fn query(
        &self,
        filter: &TransactionFilter,
        options: &QueryOptions,
    ) -> Result<QueryPage, LedgerError> {
        let norm = QueryBuilder::normalize(filter, options)?;
        Ok(self.query_normalized(&norm))
    }

    pub(crate) fn query_normalized(&self, norm: &NormalizedQuery) -> QueryPage {
        let mut matched: Vec<&TransactionRecord> = self
            .candidate_ids(&norm.filter)
            .into_iter()
            .filter_map(|id| self.records.get(id))
            .filter(|rec| norm.filter.matches(rec))
            .collect();

        self.sort_records(&mut matched, norm.sort_by, norm.sort_dir);

        let total_count = matched.len();
        let records: Vec<TransactionRecord> = matched
            .into_iter()
            .skip(norm.offset)
            .take(norm.limit)
            .cloned()
            .collect();
        let has_more = norm.offset + records.len() < total_count;

        QueryPage {
            has_more,
            next_offset: has_more.then_some(norm.offset + norm.limit),
            records,
            total_count,
        }
    }

    /// Counts straight off the maintained indices.
    pub fn statistics(&self) -> RepositoryStats {
        let status_count =
            |s: TxStatus| self.by_status.get(&s).map_or(0, HashSet::len);
        let direction_count =
            |d: TxDirection| self.by_direction.get(&d).map_or(0, HashSet::len);
        RepositoryStats {
            total: self.records.len(),
            pending: status_count(TxStatus::Pending),
            completed: status_count(TxStatus::Completed),
            cancelled: status_count(TxStatus::Cancelled),
            failed: status_count(TxStatus::Failed),
            inbound: direction_count(TxDirection::Inbound),
            outbound: direction_count(TxDirection::Outbound),
            ordered_len: self.ordered.len(),
            earliest_timestamp: self.ordered.first().map(|k| k.timestamp),
            latest_timestamp: self.ordered.last().map(|k| k.timestamp),
        }
    }

    // ── Index maintenance ───────────────────────────────────────────────

    fn index_insert(&mut self, record: &TransactionRecord) {
        self.by_status
            .entry(record.status)
            .or_default()
            .insert(record.id.clone());
        self.by_direction
            .entry(record.direction)
            .or_default()
            .insert(record.id.clone());
        self.by_address
            .entry(record.address.clone())
            .or_default()
            .insert(record.id.clone());
    }

    fn index_retract(&mut self, record: &TransactionRecord) {
        if let Some(set) = self.by_status.get_mut(&record.status) {
            set.remove(&record.id);
            if set.is_empty() {
                self.by_status.remove(&record.status);
            }
        }
        if let Some(set) = self.by_direction.get_mut(&record.direction) {
            set.remove(&record.id);
            if set.is_empty() {
                self.by_direction.remove(&record.direction);
            }
        }
        if let Some(set) = self.by_address.get_mut(&record.address) {
            set.remove(&record.id);
            if set.is_empty() {
                self.by_address.remove(&record.address);
            }
        }
    }

    /// Incremental ordered insertion: binary search for the slot, no re-sort.
    fn ordered_insert(&mut self, timestamp: u64, id: &TxId) {
        let seq = *self.seq_of.entry(id.clone()).or_insert_with(|| {
            let s = self.next_seq;
            self.next_seq += 1;
            s
        });
        let idx = self
            .ordered
            .partition_point(|k| (k.timestamp, k.seq) <= (timestamp, seq));
        self.ordered.insert(
            idx,
            OrderedKey {
                timestamp,
                seq,
                id: id.clone(),
            },
        );
    }

    fn ordered_remove(&mut self, timestamp: u64, id: &TxId) {
        let seq = match self.seq_of.get(id) {
            Some(seq) => *seq,
            None => return,
        };
        let idx = self
            .ordered
            .partition_point(|k| (k.timestamp, k.seq) < (timestamp, seq));
        if self.ordered.get(idx).is_some_and(|k| k.id == *id) {
            self.ordered.remove(idx);
        }
    }

    /// Full retraction of a live record from every structure.
    fn retract(&mut self, id: &TxId) -> Option<TransactionRecord> {
        let record = self.records.remove(id)?;
        self.index_retract(&record);
        self.ordered_remove(record.timestamp, id);
        self.seq_of.remove(id);
        self.access.remove(id);
        Some(record)
    }

    fn touch(&mut self, id: &TxId) {
        let stamp = self.next_access;
        self.next_access += 1;
        self.access.insert(id.clone(), stamp);
    }

    /// Evict the configured fraction of least-recently-accessed records
    /// (at least one) to make room, emitting `Removed` for each.
    fn evict_lru(&mut self) {
        let count = ((self.records.len() as f64 * self.config.evict_fraction).ceil() as usize)
            .clamp(1, self.records.len());
        let mut stamped: Vec<(u64, TxId)> = self
            .access
            .iter()
            .map(|(id, stamp)| (*stamp, id.clone()))
            .collect();
        stamped.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        let victims: Vec<TxId> = stamped.into_iter().take(count).map(|(_, id)| id).collect();
        log::info!("ledger: evicting {} least-recently-accessed records", victims.len());
        for id in victims {
            if self.retract(&id).is_some() {
                self.subscribers.emit(&LedgerEvent::Removed(id));
            }
        }
    }

    // ── Query internals ─────────────────────────────────────────────────

    /// Candidate ids from the single most selective applicable index, in
    /// time order; falls back to the whole ordered sequence.
    fn candidate_ids(&self, filter: &TransactionFilter) -> Vec<&TxId> {
        let narrowed: Option<HashSet<&TxId>> = if let Some(address) = &filter.address {
            Some(self.by_address.get(address).into_iter().flatten().collect())
        } else if let Some(statuses) = &filter.status {
            Some(
                statuses
                    .iter()
                    .filter_map(|s| self.by_status.get(s))
                    .flatten()
                    .collect(),
            )
        } else if let Some(directions) = &filter.direction {
            Some(
                directions
                    .iter()
                    .filter_map(|d| self.by_direction.get(d))
                    .flatten()
                    .collect(),
            )
        } else {
            None
        };

        match narrowed {
            Some(set) => self
                .ordered
                .iter()
                .map(|k| &k.id)
                .filter(|id| set.contains(*id))
                .collect(),
            None => self.ordered.iter().map(|k| &k.id).collect(),
        }
    }

    fn sort_records(
        &self,
        records: &mut [&TransactionRecord],
        sort_by: SortField,
        sort_dir: SortDirection,
    ) {
        let seq = |r: &TransactionRecord| self.seq_of.get(&r.id).copied().unwrap_or(0);
        let status_rank = |s: TxStatus| match s {
            TxStatus::Pending => 0u8,
            TxStatus::Completed => 1,
            TxStatus::Cancelled => 2,
            TxStatus::Failed => 3,
        };
        records.sort_by(|a, b| {
            let ord = match sort_by {
                SortField::Timestamp => (a.timestamp, seq(a)).cmp(&(b.timestamp, seq(b))),
                SortField::Amount => a
                    .amount
                    .cmp(&b.amount)
                    .then((a.timestamp, seq(a)).cmp(&(b.timestamp, seq(b)))),
                SortField::Fee => a
                    .fee
                    .cmp(&b.fee)
                    .then((a.timestamp, seq(a)).cmp(&(b.timestamp, seq(b)))),
                SortField::Status => status_rank(a.status)
                    .cmp(&status_rank(b.status))
                    .then((a.timestamp, seq(a)).cmp(&(b.timestamp, seq(b)))),
            };
            match sort_dir {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
    }

    #[cfg(test)]
    pub(crate) fn ordered_timestamps(&self) -> Vec<(u64, u64)> {
        self.ordered.iter().map(|k| (k.timestamp, k.seq)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citrine_types::MicroAmount;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn record(id: &str, status: TxStatus, timestamp: u64) -> TransactionRecord {
        TransactionRecord::new(
            id,
            TxDirection::Inbound,
            status,
            MicroAmount(1_000_000),
            "addr_a",
            timestamp,
        )
    }

    fn repo() -> TransactionRepository {
        TransactionRepository::default()
    }

    #[test]
    fn test_duplicate_add_rejected_without_side_effects() {
        let mut r = repo();
        r.add(record("t1", TxStatus::Pending, 100)).unwrap();

        let mut dup = record("t1", TxStatus::Completed, 200);
        dup.address = "addr_b".into();
        let err = r.add(dup);
        assert!(matches!(err, Err(LedgerError::AlreadyExists(_))));

        // Existing record and all indices untouched.
        assert_eq!(r.len(), 1);
        let got = r.get(&TxId::from("t1")).unwrap();
        assert_eq!(got.status, TxStatus::Pending);
        assert_eq!(r.statistics().pending, 1);
        assert_eq!(r.statistics().completed, 0);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let mut r = repo();
        let err = r.update(record("ghost", TxStatus::Pending, 1));
        assert!(matches!(err, Err(LedgerError::NotFound(_))));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut r = repo();
        r.add(record("t1", TxStatus::Pending, 1)).unwrap();
        assert!(r.remove(&TxId::from("t1")).is_some());
        assert!(r.remove(&TxId::from("t1")).is_none());
        assert!(r.remove(&TxId::from("never")).is_none());
    }

    #[test]
    fn test_status_flip_moves_index_buckets() {
        let mut r = repo();
        r.add(record("t1", TxStatus::Pending, 100)).unwrap();

        let pending = TransactionFilter {
            status: Some(vec![TxStatus::Pending]),
            ..TransactionFilter::default()
        };
        let completed = TransactionFilter {
            status: Some(vec![TxStatus::Completed]),
            ..TransactionFilter::default()
        };
        let opts = QueryOptions::default();

        let page = r.query(&pending, &opts).unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].id, TxId::from("t1"));

        let mut upd = record("t1", TxStatus::Completed, 100);
        upd.confirmations = 5;
        r.update(upd).unwrap();

        assert!(r.query(&pending, &opts).unwrap().records.is_empty());
        let page = r.query(&completed, &opts).unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].id, TxId::from("t1"));
    }

    #[test]
    fn test_ordered_sequence_stays_sorted() {
        let mut r = repo();
        for (id, ts) in [("a", 50), ("b", 10), ("c", 30), ("d", 10), ("e", 70)] {
            r.add(record(id, TxStatus::Pending, ts)).unwrap();
        }
        let keys = r.ordered_timestamps();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));

        // Reposition by changing a timestamp; still sorted.
        r.update(record("b", TxStatus::Pending, 60)).unwrap();
        let keys = r.ordered_timestamps();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(keys.len(), 5);

        r.remove(&TxId::from("c"));
        assert_eq!(r.ordered_timestamps().len(), 4);
    }

    #[test]
    fn test_timestamp_tie_broken_by_insertion_order() {
        let mut r = repo();
        r.add(record("first", TxStatus::Pending, 100)).unwrap();
        r.add(record("second", TxStatus::Pending, 100)).unwrap();

        let opts = QueryOptions {
            sort_dir: Some(SortDirection::Asc),
            ..QueryOptions::default()
        };
        let page = r.query(&TransactionFilter::default(), &opts).unwrap();
        assert_eq!(page.records[0].id, TxId::from("first"));
        assert_eq!(page.records[1].id, TxId::from("second"));
    }

    #[test]
    fn test_query_defaults_newest_first() {
        let mut r = repo();
        for (id, ts) in [("a", 10), ("b", 30), ("c", 20)] {
            r.add(record(id, TxStatus::Pending, ts)).unwrap();
        }
        let page = r
            .query(&TransactionFilter::default(), &QueryOptions::default())
            .unwrap();
        let ids: Vec<&str> = page.records.iter().map(|x| x.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn test_address_index_narrowing() {
        let mut r = repo();
        for i in 0..20 {
            let mut rec = record(&format!("t{i}"), TxStatus::Pending, i);
            if i % 5 == 0 {
                rec.address = "addr_b".into();
            }
            r.add(rec).unwrap();
        }
        let filter = TransactionFilter {
            address: Some("addr_b".into()),
            ..TransactionFilter::default()
        };
        let page = r.query(&filter, &QueryOptions::default()).unwrap();
        assert_eq!(page.total_count, 4);
        assert!(page.records.iter().all(|x| x.address == "addr_b"));
    }

    #[test]
    fn test_pagination_completeness() {
        let mut r = repo();
        for i in 0..37 {
            r.add(record(&format!("t{i}"), TxStatus::Pending, i)).unwrap();
        }

        let mut collected = Vec::new();
        let mut offset = 0;
        loop {
            let opts = QueryOptions {
                offset,
                limit: Some(10),
                ..QueryOptions::default()
            };
            let page = r.query(&TransactionFilter::default(), &opts).unwrap();
            collected.extend(page.records.iter().map(|x| x.id.clone()));
            if !page.has_more {
                break;
            }
            offset = page.next_offset.unwrap();
        }

        let all = r
            .query(
                &TransactionFilter::default(),
                &QueryOptions {
                    limit: Some(1000),
                    ..QueryOptions::default()
                },
            )
            .unwrap();
        let all_ids: Vec<TxId> = all.records.iter().map(|x| x.id.clone()).collect();
        assert_eq!(collected, all_ids);
        assert_eq!(collected.len(), 37);
    }

    #[test]
    fn test_has_more_flag() {
        let mut r = repo();
        for i in 0..5 {
            r.add(record(&format!("t{i}"), TxStatus::Pending, i)).unwrap();
        }
        let opts = QueryOptions {
            offset: 3,
            limit: Some(2),
            ..QueryOptions::default()
        };
        let page = r.query(&TransactionFilter::default(), &opts).unwrap();
        assert_eq!(page.records.len(), 2);
        assert!(!page.has_more);
        assert!(page.next_offset.is_none());
    }

    #[test]
    fn test_capacity_eviction_is_least_recently_accessed() {
        let mut r = TransactionRepository::new(RepositoryConfig {
            capacity: 100,
            evict_fraction: 0.1,
        });
        for i in 0..100 {
            r.add(record(&format!("t{i}"), TxStatus::Pending, i)).unwrap();
        }
        // Touch t1 so it outlives older-but-unaccessed neighbors.
        assert!(r.get(&TxId::from("t1")).is_some());

        for i in 100..150 {
            r.add(record(&format!("t{i}"), TxStatus::Pending, i)).unwrap();
        }

        assert!(r.records.contains_key(&TxId::from("t1")));
        assert!(!r.records.contains_key(&TxId::from("t10")));
        assert!(r.len() <= 100);
    }

    #[test]
    fn test_clear_emits_removed_per_record() {
        let mut r = repo();
        let removed = Arc::new(AtomicUsize::new(0));
        let c = removed.clone();
        r.subscribe(move |ev| {
            if matches!(ev, LedgerEvent::Removed(_)) {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });
        for i in 0..7 {
            r.add(record(&format!("t{i}"), TxStatus::Pending, i)).unwrap();
        }
        r.clear();
        assert_eq!(removed.load(Ordering::SeqCst), 7);
        assert!(r.is_empty());
        assert_eq!(r.statistics().ordered_len, 0);
    }

    #[test]
    fn test_events_fire_after_consistency() {
        // The handler queries nothing (it can't, the lock discipline is the
        // caller's), but the emitted Updated event must carry the diff.
        let mut r = repo();
        let saw_diff = Arc::new(AtomicUsize::new(0));
        let c = saw_diff.clone();
        r.subscribe(move |ev| {
            if let LedgerEvent::Updated { diff, previous_status, new_status, .. } = ev {
                assert_eq!(*previous_status, TxStatus::Pending);
                assert_eq!(*new_status, TxStatus::Completed);
                assert_eq!(diff.confirmations, Some((0, 3)));
                c.fetch_add(1, Ordering::SeqCst);
            }
        });
        r.add(record("t1", TxStatus::Pending, 1)).unwrap();
        let mut upd = record("t1", TxStatus::Completed, 1);
        upd.confirmations = 3;
        r.update(upd).unwrap();
        assert_eq!(saw_diff.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_statistics_from_indices() {
        let mut r = repo();
        r.add(record("a", TxStatus::Pending, 10)).unwrap();
        r.add(record("b", TxStatus::Completed, 20)).unwrap();
        let mut out = record("c", TxStatus::Failed, 30);
        out.direction = TxDirection::Outbound;
        r.add(out).unwrap();

        let stats = r.statistics();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.cancelled, 0);
        assert_eq!(stats.inbound, 2);
        assert_eq!(stats.outbound, 1);
        assert_eq!(stats.earliest_timestamp, Some(10));
        assert_eq!(stats.latest_timestamp, Some(30));
    }

    #[test]
    fn test_amount_sort() {
        let mut r = repo();
        for (id, amt) in [("a", 300u128), ("b", 100), ("c", 200)] {
            let mut rec = record(id, TxStatus::Pending, 1);
            rec.amount = MicroAmount(amt);
            r.add(rec).unwrap();
        }
        let opts = QueryOptions {
            sort_by: Some(SortField::Amount),
            sort_dir: Some(SortDirection::Asc),
            ..QueryOptions::default()
        };
        let page = r.query(&TransactionFilter::default(), &opts).unwrap();
        let ids: Vec<&str> = page.records.iter().map(|x| x.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }
}
