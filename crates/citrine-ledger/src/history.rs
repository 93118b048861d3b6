//! Transaction history service.
//!
//! The single caller-facing facade over the repository, query builder, and
//! post-index filters. Adds a TTL/LRU result cache keyed by the normalized
//! `(filter, options)` pair; any repository mutation clears the whole cache
//! (coarse invalidation is a deliberate simplicity/correctness trade-off,
//! since transaction mutation rates are low relative to read rates).

use crate::enrich::{enrich, EnrichedTransaction};
use crate::error::LedgerError;
use crate::events::SubscriptionId;
use crate::export::{self, ExportFormat, ExportResult};
use crate::filters::{self, CustomPredicate, TagMatch};
use crate::query::{now_millis, NormalizedQuery, QueryBuilder, QueryOptions, TransactionFilter};
use crate::repository::TransactionRepository;
use citrine_cache::QueryCache;
use citrine_types::{MicroAmount, TransactionRecord, TxDirection, TxStatus};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// History service tuning.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Rows fetched from the repository per batch when an operation needs
    /// the full matching set (statistics, export, post-filtered queries).
    pub batch_size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig { batch_size: 1000 }
    }
}

/// Filter accepted by the history service: the repository's index-servable
/// fields plus post-index criteria.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryFilter {
    #[serde(flatten)]
    pub base: TransactionFilter,
    /// Case-insensitive regex over message, address, and tags.
    pub pattern: Option<String>,
    pub tags: Option<Vec<String>>,
    pub tag_match: TagMatch,
    pub max_age_ms: Option<u64>,
    pub min_fee_ratio: Option<f64>,
}

impl HistoryFilter {
    pub fn from_base(base: TransactionFilter) -> Self {
        HistoryFilter {
            base,
            ..HistoryFilter::default()
        }
    }

    fn has_post_filters(&self) -> bool {
        self.pattern.is_some()
            || self.tags.as_deref().is_some_and(|t| !t.is_empty())
            || self.max_age_ms.is_some()
            || self.min_fee_ratio.is_some()
    }
}

/// One page of enriched history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub data: Vec<EnrichedTransaction>,
    pub total_count: usize,
    pub has_more: bool,
    pub next_offset: Option<usize>,
}

/// Search response: ranked matches plus query diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub transactions: Vec<EnrichedTransaction>,
    pub total_matches: usize,
    pub query: String,
    pub execution_time_ms: u64,
    pub is_truncated: bool,
    pub suggestions: Vec<String>,
}

/// Aggregates over the full matching set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStatistics {
    pub total_count: usize,
    pub inbound_count: usize,
    pub outbound_count: usize,
    pub pending_count: usize,
    pub completed_count: usize,
    pub cancelled_count: usize,
    pub failed_count: usize,
    pub inbound_total: MicroAmount,
    pub outbound_total: MicroAmount,
    pub fee_total: MicroAmount,
    pub earliest_timestamp: Option<u64>,
    pub latest_timestamp: Option<u64>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>) -> Result<MutexGuard<'a, T>, LedgerError> {
    mutex.lock().map_err(|e| LedgerError::Lock(e.to_string()))
}

/// Caller-facing history facade. Construct the repository and the cache
/// once at application start and hand them in; the service subscribes to
/// repository mutations and clears its cache on every one.
pub struct HistoryService {
    repo: Arc<Mutex<TransactionRepository>>,
    cache: Arc<Mutex<QueryCache<HistoryPage>>>,
    subscription: Mutex<Option<SubscriptionId>>,
    disposed: AtomicBool,
    maintenance_errors: Arc<AtomicU64>,
    config: HistoryConfig,
}

impl HistoryService {
    pub fn new(
        repo: Arc<Mutex<TransactionRepository>>,
        cache: Arc<Mutex<QueryCache<HistoryPage>>>,
        config: HistoryConfig,
    ) -> Result<Self, LedgerError> {
        let weak = Arc::downgrade(&cache);
        let subscription = lock(&repo)?.subscribe(move |_event| {
            // Any mutation invalidates every cached page.
            if let Some(cache) = weak.upgrade() {
                match cache.lock() {
                    Ok(mut cache) => cache.clear(),
                    Err(e) => log::warn!("history cache poisoned during invalidation: {e}"),
                }
            }
        });
        Ok(HistoryService {
            repo,
            cache,
            subscription: Mutex::new(Some(subscription)),
            disposed: AtomicBool::new(false),
            maintenance_errors: Arc::new(AtomicU64::new(0)),
            config,
        })
    }

    fn ensure_live(&self) -> Result<(), LedgerError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(LedgerError::Disposed);
        }
        Ok(())
    }

    // ── History ─────────────────────────────────────────────────────────

    /// Filtered, paginated, enriched history. Results are cached per
    /// `(filter, options)` until the TTL runs out or a mutation lands.
    pub fn get_transaction_history(
        &self,
        filter: &HistoryFilter,
        options: &QueryOptions,
    ) -> Result<HistoryPage, LedgerError> {
        self.ensure_live()?;
        let key = cache_key(filter, options)?;
        if let Some(page) = lock(&self.cache)?.get(&key) {
            return Ok(page);
        }
        let page = self.run_query(filter, options, None)?;
        lock(&self.cache)?.insert(key, page.clone());
        Ok(page)
    }

    /// Like [`get_transaction_history`], with a caller-supplied predicate.
    /// Predicates are not serializable, so this path bypasses the cache.
    ///
    /// [`get_transaction_history`]: HistoryService::get_transaction_history
    pub fn get_transaction_history_with(
        &self,
        filter: &HistoryFilter,
        options: &QueryOptions,
        predicate: CustomPredicate<'_>,
    ) -> Result<HistoryPage, LedgerError> {
        self.ensure_live()?;
        self.run_query(filter, options, Some(predicate))
    }

    /// The newest `limit` transactions, enriched.
    pub fn get_recent_activity(
        &self,
        limit: usize,
    ) -> Result<Vec<EnrichedTransaction>, LedgerError> {
        self.ensure_live()?;
        let options = QueryOptions {
            limit: Some(limit),
            ..QueryOptions::default()
        };
        let page = lock(&self.repo)?.query(&TransactionFilter::default(), &options)?;
        let now = now_millis();
        Ok(page.records.iter().map(|r| enrich(r, now)).collect())
    }

    // ── Search ──────────────────────────────────────────────────────────

    /// Relevance-ranked free-text search over the filtered set.
    pub fn search_transaction_history(
        &self,
        query: &str,
        filter: &HistoryFilter,
        options: &QueryOptions,
    ) -> Result<SearchResults, LedgerError> {
        self.ensure_live()?;
        let started = Instant::now();
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::InvalidInput("empty search query".to_string()));
        }
        let norm = QueryBuilder::normalize(&filter.base, options)?;
        let candidates = self.collect_filtered(filter, None)?;
        let hits = filters::search(&candidates, trimmed);

        let total_matches = hits.len();
        let transactions: Vec<EnrichedTransaction> = hits
            .into_iter()
            .take(norm.limit)
            .map(|hit| hit.tx)
            .collect();
        let is_truncated = total_matches > transactions.len();

        Ok(SearchResults {
            is_truncated,
            total_matches,
            transactions,
            query: trimmed.to_string(),
            execution_time_ms: started.elapsed().as_millis() as u64,
            suggestions: suggestions_for(trimmed),
        })
    }

    // ── Statistics & Export ─────────────────────────────────────────────

    /// Aggregate counts and sums over every record matching the filter,
    /// optionally narrowed to a timestamp range. Pages through the
    /// repository in fixed batches to bound peak memory.
    pub fn get_transaction_statistics(
        &self,
        filter: &HistoryFilter,
        time_range: Option<(u64, u64)>,
    ) -> Result<HistoryStatistics, LedgerError> {
        self.ensure_live()?;
        let mut filter = filter.clone();
        if let Some((from, to)) = time_range {
            filter.base.min_timestamp =
                Some(filter.base.min_timestamp.map_or(from, |m| m.max(from)));
            filter.base.max_timestamp =
                Some(filter.base.max_timestamp.map_or(to, |m| m.min(to)));
        }
        // A range disjoint from the filter's own bounds matches nothing;
        // both inputs are individually valid, so this is not an error.
        if let (Some(min), Some(max)) = (filter.base.min_timestamp, filter.base.max_timestamp) {
            if min > max {
                return Ok(HistoryStatistics::default());
            }
        }
        let matching = self.collect_filtered(&filter, None)?;

        let mut stats = HistoryStatistics::default();
        for tx in &matching {
            let rec = &tx.record;
            stats.total_count += 1;
            match rec.direction {
                TxDirection::Inbound => {
                    stats.inbound_count += 1;
                    stats.inbound_total += rec.amount;
                }
                TxDirection::Outbound => {
                    stats.outbound_count += 1;
                    stats.outbound_total += rec.amount;
                }
            }
            match rec.status {
                TxStatus::Pending => stats.pending_count += 1,
                TxStatus::Completed => stats.completed_count += 1,
                TxStatus::Cancelled => stats.cancelled_count += 1,
                TxStatus::Failed => stats.failed_count += 1,
            }
            stats.fee_total += rec.fee;
            stats.earliest_timestamp = Some(
                stats
                    .earliest_timestamp
                    .map_or(rec.timestamp, |t| t.min(rec.timestamp)),
            );
            stats.latest_timestamp = Some(
                stats
                    .latest_timestamp
                    .map_or(rec.timestamp, |t| t.max(rec.timestamp)),
            );
        }
        Ok(stats)
    }

    /// Render everything matching the filter in the requested format.
    /// An unknown format fails before any scanning (parse `ExportFormat`
    /// up front when accepting strings).
    pub fn export_transaction_history(
        &self,
        filter: &HistoryFilter,
        format: ExportFormat,
    ) -> Result<ExportResult, LedgerError> {
        self.ensure_live()?;
        let matching = self.collect_filtered(filter, None)?;
        export::render(&matching, format, now_millis())
    }

    // ── Lifecycle & Maintenance ─────────────────────────────────────────

    /// Detach from the repository and drop all cached pages. Idempotent;
    /// never fails. Every later call on this service fails with
    /// `Disposed`.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.subscription.lock() {
            Ok(mut slot) => {
                if let Some(id) = slot.take() {
                    match self.repo.lock() {
                        Ok(mut repo) => {
                            repo.unsubscribe(id);
                        }
                        Err(e) => log::warn!("repository lock poisoned during dispose: {e}"),
                    }
                }
            }
            Err(e) => log::warn!("subscription lock poisoned during dispose: {e}"),
        }
        match self.cache.lock() {
            Ok(mut cache) => cache.clear(),
            Err(e) => log::warn!("cache lock poisoned during dispose: {e}"),
        }
        log::debug!("history service disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Number of background-maintenance failures so far. Maintenance
    /// errors never surface into query paths; they are counted here and
    /// logged instead.
    pub fn maintenance_errors(&self) -> u64 {
        self.maintenance_errors.load(Ordering::SeqCst)
    }

    /// Periodically sweep expired cache entries. The task ends on its own
    /// once every owner of the cache is gone.
    pub fn spawn_maintenance(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let cache = Arc::downgrade(&self.cache);
        let errors = self.maintenance_errors.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                let Some(cache) = cache.upgrade() else { break };
                match cache.lock() {
                    Ok(mut cache) => {
                        cache.purge_expired();
                    }
                    Err(e) => {
                        errors.fetch_add(1, Ordering::SeqCst);
                        log::warn!("cache maintenance sweep failed: {e}");
                    }
                };
            }
        })
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn run_query(
        &self,
        filter: &HistoryFilter,
        options: &QueryOptions,
        predicate: Option<CustomPredicate<'_>>,
    ) -> Result<HistoryPage, LedgerError> {
        let norm = QueryBuilder::normalize(&filter.base, options)?;
        let now = now_millis();

        if !filter.has_post_filters() && predicate.is_none() {
            // Fast path: pagination is applied inside the repository.
            let page = lock(&self.repo)?.query_normalized(&norm);
            return Ok(HistoryPage {
                data: page.records.iter().map(|r| enrich(r, now)).collect(),
                total_count: page.total_count,
                has_more: page.has_more,
                next_offset: page.next_offset,
            });
        }

        // Post-index filters change the matching set, so pagination has to
        // happen after them.
        let filtered = self.collect_filtered_sorted(filter, options, predicate)?;
        let total_count = filtered.len();
        let data: Vec<EnrichedTransaction> = filtered
            .into_iter()
            .skip(norm.offset)
            .take(norm.limit)
            .collect();
        let has_more = norm.offset + data.len() < total_count;
        Ok(HistoryPage {
            has_more,
            next_offset: has_more.then_some(norm.offset + norm.limit),
            data,
            total_count,
        })
    }

    /// Enrich and post-filter every record matching the base filter,
    /// in the default timestamp-descending order.
    fn collect_filtered(
        &self,
        filter: &HistoryFilter,
        predicate: Option<CustomPredicate<'_>>,
    ) -> Result<Vec<EnrichedTransaction>, LedgerError> {
        self.collect_filtered_sorted(filter, &QueryOptions::default(), predicate)
    }

    /// Enrich and post-filter every record matching the base filter,
    /// fetched in fixed-size batches under one repository lock. The
    /// caller's sort is applied during the fetch; pagination is not,
    /// since post-filters shrink the set afterwards.
    fn collect_filtered_sorted(
        &self,
        filter: &HistoryFilter,
        options: &QueryOptions,
        predicate: Option<CustomPredicate<'_>>,
    ) -> Result<Vec<EnrichedTransaction>, LedgerError> {
        let sort_only = QueryOptions {
            sort_by: options.sort_by,
            sort_dir: options.sort_dir,
            ..QueryOptions::default()
        };
        let norm = QueryBuilder::normalize(&filter.base, &sort_only)?;
        let records = self.fetch_all_matching(&norm)?;
        let now = now_millis();
        let mut txs: Vec<EnrichedTransaction> =
            records.iter().map(|r| enrich(r, now)).collect();

        if let Some(pattern) = &filter.pattern {
            txs = filters::regex_filter(txs, pattern)?;
        }
        if let Some(tags) = &filter.tags {
            txs = filters::tag_filter(txs, tags, filter.tag_match);
        }
        if let Some(max_age) = filter.max_age_ms {
            txs = filters::max_age_filter(txs, max_age);
        }
        if let Some(ratio) = filter.min_fee_ratio {
            txs = filters::min_fee_ratio_filter(txs, ratio);
        }
        if let Some(predicate) = predicate {
            txs = filters::apply_predicate(txs, predicate)?;
        }
        Ok(txs)
    }

    fn fetch_all_matching(
        &self,
        norm: &NormalizedQuery,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        let repo = lock(&self.repo)?;
        let mut all = Vec::new();
        let mut batch = norm.clone();
        batch.offset = 0;
        batch.limit = self.config.batch_size.max(1);
        loop {
            let page = repo.query_normalized(&batch);
            let fetched = page.records.len();
            all.extend(page.records);
            if !page.has_more || fetched == 0 {
                break;
            }
            batch.offset += batch.limit;
        }
        Ok(all)
    }
}

fn cache_key(filter: &HistoryFilter, options: &QueryOptions) -> Result<String, LedgerError> {
    serde_json::to_string(&(filter, options))
        .map_err(|e| LedgerError::InvalidInput(format!("unserializable query: {e}")))
}

/// Query-refinement hints derived from the input shape.
fn suggestions_for(query: &str) -> Vec<String> {
    let mut out = Vec::new();
    if query.parse::<f64>().is_ok() {
        out.push("numeric query: an amount range filter may match better".to_string());
    }
    if looks_like_date(query) {
        out.push("date-like query: a timestamp range filter may match better".to_string());
    }
    if query.chars().count() < 3 {
        out.push("short queries match broadly; try at least 3 characters".to_string());
    }
    out
}

fn looks_like_date(query: &str) -> bool {
    let bytes = query.as_bytes();
    bytes.len() >= 10
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use citrine_cache::CacheConfig;
    use citrine_types::TxId;

    fn record(id: &str, message: Option<&str>, timestamp: u64) -> TransactionRecord {
        let mut rec = TransactionRecord::new(
            id,
            TxDirection::Inbound,
            TxStatus::Pending,
            MicroAmount(1_000_000),
            "addr_a",
            timestamp,
        );
        rec.message = message.map(str::to_string);
        rec
    }

    fn service_with(records: Vec<TransactionRecord>) -> (HistoryService, Arc<Mutex<TransactionRepository>>) {
        let repo = Arc::new(Mutex::new(TransactionRepository::default()));
        {
            let mut r = repo.lock().unwrap();
            for rec in records {
                r.add(rec).unwrap();
            }
        }
        let cache = Arc::new(Mutex::new(QueryCache::new(CacheConfig::default())));
        let service = HistoryService::new(repo.clone(), cache, HistoryConfig::default()).unwrap();
        (service, repo)
    }

    #[test]
    fn test_history_enriched_and_paged() {
        let (svc, _repo) = service_with(vec![
            record("a", None, 10),
            record("b", None, 20),
            record("c", None, 30),
        ]);
        let page = svc
            .get_transaction_history(
                &HistoryFilter::default(),
                &QueryOptions {
                    limit: Some(2),
                    ..QueryOptions::default()
                },
            )
            .unwrap();
        assert_eq!(page.total_count, 3);
        assert!(page.has_more);
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].record.id, TxId::from("c"));
        assert_eq!(page.data[0].status_label, "Pending");
        assert!(page.data[0].has_tag("inbound"));
    }

    #[test]
    fn test_cache_hit_returns_same_page() {
        let (svc, _repo) = service_with(vec![record("a", None, 10)]);
        let filter = HistoryFilter::default();
        let opts = QueryOptions::default();
        let first = svc.get_transaction_history(&filter, &opts).unwrap();
        let second = svc.get_transaction_history(&filter, &opts).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_mutation_between_identical_queries_invalidates() {
        let (svc, repo) = service_with(vec![record("a", None, 10)]);
        let filter = HistoryFilter::default();
        let opts = QueryOptions::default();
        assert_eq!(svc.get_transaction_history(&filter, &opts).unwrap().total_count, 1);

        repo.lock().unwrap().add(record("b", None, 20)).unwrap();

        let page = svc.get_transaction_history(&filter, &opts).unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.data[0].record.id, TxId::from("b"));
    }

    #[test]
    fn test_post_filtered_pagination() {
        let mut records = Vec::new();
        for i in 0..30 {
            let msg = if i % 2 == 0 { Some("invoice") } else { Some("gift") };
            records.push(record(&format!("t{i}"), msg, i));
        }
        let (svc, _repo) = service_with(records);

        let filter = HistoryFilter {
            pattern: Some("invoice".to_string()),
            ..HistoryFilter::default()
        };
        let mut seen = Vec::new();
        let mut offset = 0;
        loop {
            let page = svc
                .get_transaction_history(
                    &filter,
                    &QueryOptions {
                        offset,
                        limit: Some(4),
                        ..QueryOptions::default()
                    },
                )
                .unwrap();
            assert_eq!(page.total_count, 15);
            seen.extend(page.data.iter().map(|tx| tx.record.id.clone()));
            if !page.has_more {
                break;
            }
            offset = page.next_offset.unwrap();
        }
        assert_eq!(seen.len(), 15);
        seen.dedup();
        assert_eq!(seen.len(), 15);
    }

    #[test]
    fn test_post_filtered_query_honors_sort() {
        use crate::query::{SortDirection, SortField};

        let mut mid = record("a_mid", Some("invoice"), 10);
        mid.amount = MicroAmount(200);
        let mut small = record("b_small", Some("invoice"), 20);
        small.amount = MicroAmount(100);
        let mut big = record("c_big", Some("invoice"), 30);
        big.amount = MicroAmount(300);
        let other = record("d_other", Some("gift"), 40);
        let (svc, _repo) = service_with(vec![mid, small, big, other]);

        let filter = HistoryFilter {
            pattern: Some("invoice".to_string()),
            ..HistoryFilter::default()
        };
        let page = svc
            .get_transaction_history(
                &filter,
                &QueryOptions {
                    sort_by: Some(SortField::Amount),
                    sort_dir: Some(SortDirection::Asc),
                    ..QueryOptions::default()
                },
            )
            .unwrap();
        let ids: Vec<&str> = page.data.iter().map(|tx| tx.record.id.as_str()).collect();
        assert_eq!(ids, ["b_small", "a_mid", "c_big"]);
    }

    #[test]
    fn test_search_ranks_exact_first() {
        let (svc, _repo) = service_with(vec![
            record("prefix", Some("abcdef"), 100),
            record("exact", Some("abc"), 100),
        ]);
        let results = svc
            .search_transaction_history("abc", &HistoryFilter::default(), &QueryOptions::default())
            .unwrap();
        assert_eq!(results.total_matches, 2);
        assert_eq!(results.transactions[0].record.id, TxId::from("exact"));
        assert!(!results.is_truncated);
        assert_eq!(results.query, "abc");
    }

    #[test]
    fn test_search_empty_query_rejected() {
        let (svc, _repo) = service_with(vec![]);
        let err = svc.search_transaction_history(
            "  ",
            &HistoryFilter::default(),
            &QueryOptions::default(),
        );
        assert!(matches!(err, Err(LedgerError::InvalidInput(_))));
    }

    #[test]
    fn test_search_suggestions() {
        let (svc, _repo) = service_with(vec![]);
        let numeric = svc
            .search_transaction_history("123.5", &HistoryFilter::default(), &QueryOptions::default())
            .unwrap();
        assert!(numeric.suggestions.iter().any(|s| s.contains("amount")));

        let dated = svc
            .search_transaction_history(
                "2026-01-15",
                &HistoryFilter::default(),
                &QueryOptions::default(),
            )
            .unwrap();
        assert!(dated.suggestions.iter().any(|s| s.contains("timestamp")));

        let short = svc
            .search_transaction_history("ab", &HistoryFilter::default(), &QueryOptions::default())
            .unwrap();
        assert!(short.suggestions.iter().any(|s| s.contains("3 characters")));
    }

    #[test]
    fn test_statistics() {
        let mut out = record("out", None, 50);
        out.direction = TxDirection::Outbound;
        out.fee = MicroAmount(500);
        let mut done = record("done", None, 20);
        done.status = TxStatus::Completed;
        let (svc, _repo) = service_with(vec![record("a", None, 10), done, out]);

        let stats = svc
            .get_transaction_statistics(&HistoryFilter::default(), None)
            .unwrap();
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.inbound_count, 2);
        assert_eq!(stats.outbound_count, 1);
        assert_eq!(stats.pending_count, 2);
        assert_eq!(stats.completed_count, 1);
        assert_eq!(stats.fee_total, MicroAmount(500));
        assert_eq!(stats.earliest_timestamp, Some(10));
        assert_eq!(stats.latest_timestamp, Some(50));

        let ranged = svc
            .get_transaction_statistics(&HistoryFilter::default(), Some((15, 30)))
            .unwrap();
        assert_eq!(ranged.total_count, 1);
    }

    #[test]
    fn test_statistics_disjoint_range_is_empty() {
        let (svc, _repo) = service_with(vec![record("a", None, 10)]);
        let filter = HistoryFilter::from_base(TransactionFilter {
            min_timestamp: Some(100),
            ..TransactionFilter::default()
        });
        let stats = svc.get_transaction_statistics(&filter, Some((0, 50))).unwrap();
        assert_eq!(stats, HistoryStatistics::default());
        assert_eq!(stats.total_count, 0);
    }

    #[test]
    fn test_export_csv() {
        let (svc, _repo) = service_with(vec![record("t1", Some("memo"), 5)]);
        let out = svc
            .export_transaction_history(&HistoryFilter::default(), ExportFormat::Csv)
            .unwrap();
        assert!(out.filename.ends_with(".csv"));
        assert!(out.data.contains("t1,inbound,Pending"));
    }

    #[test]
    fn test_custom_predicate_bypasses_cache_and_can_fail() {
        let (svc, _repo) = service_with(vec![record("keep", None, 10), record("drop", None, 20)]);

        let keep_only: CustomPredicate<'_> = &|tx| Ok(tx.record.id.as_str() == "keep");
        let page = svc
            .get_transaction_history_with(
                &HistoryFilter::default(),
                &QueryOptions::default(),
                keep_only,
            )
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.data[0].record.id, TxId::from("keep"));

        let failing: CustomPredicate<'_> =
            &|_| Err(LedgerError::Predicate("bad predicate".into()));
        let err = svc.get_transaction_history_with(
            &HistoryFilter::default(),
            &QueryOptions::default(),
            failing,
        );
        assert!(matches!(err, Err(LedgerError::Predicate(_))));
    }

    #[test]
    fn test_dispose_is_idempotent_and_fails_later_calls() {
        let (svc, repo) = service_with(vec![record("a", None, 10)]);
        svc.dispose();
        svc.dispose();
        assert!(svc.is_disposed());

        let err = svc.get_transaction_history(&HistoryFilter::default(), &QueryOptions::default());
        assert!(matches!(err, Err(LedgerError::Disposed)));
        let err = svc.get_recent_activity(5);
        assert!(matches!(err, Err(LedgerError::Disposed)));
        let err = svc.export_transaction_history(&HistoryFilter::default(), ExportFormat::Json);
        assert!(matches!(err, Err(LedgerError::Disposed)));

        // Listener detached: mutations no longer reach the service.
        repo.lock().unwrap().add(record("b", None, 20)).unwrap();
    }

    #[test]
    fn test_recent_activity() {
        let (svc, _repo) = service_with(vec![
            record("old", None, 10),
            record("mid", None, 20),
            record("new", None, 30),
        ]);
        let recent = svc.get_recent_activity(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].record.id, TxId::from("new"));
        assert_eq!(recent[1].record.id, TxId::from("mid"));
    }

    #[tokio::test]
    async fn test_maintenance_sweep_runs() {
        let repo = Arc::new(Mutex::new(TransactionRepository::default()));
        let cache = Arc::new(Mutex::new(QueryCache::new(CacheConfig {
            ttl: Duration::ZERO,
            max_entries: 8,
        })));
        let svc = HistoryService::new(repo, cache.clone(), HistoryConfig::default()).unwrap();

        cache.lock().unwrap().insert("stale", HistoryPage {
            data: Vec::new(),
            total_count: 0,
            has_more: false,
            next_offset: None,
        });

        let handle = svc.spawn_maintenance(Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.lock().unwrap().is_empty());
        assert_eq!(svc.maintenance_errors(), 0);
        handle.abort();
    }
}
