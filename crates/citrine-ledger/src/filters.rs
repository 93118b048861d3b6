//! Post-index history filters.
//!
//! Predicates the repository's indices cannot express, applied over an
//! already-narrowed candidate list: scored free-text search, regex matching,
//! tag/age/fee-ratio thresholds, caller-supplied predicates, and the
//! selectivity heuristic behind filter validation.

use crate::enrich::EnrichedTransaction;
use crate::error::LedgerError;
use crate::query::TransactionFilter;
use citrine_types::TxStatus;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

const WEEK_MS: u64 = 7 * 24 * 60 * 60 * 1000;

// ─── Text Search ────────────────────────────────────────────────────────────

// Match-kind base scores: exact > prefix > word-boundary > substring.
const SCORE_EXACT: f64 = 100.0;
const SCORE_PREFIX: f64 = 60.0;
const SCORE_WORD: f64 = 40.0;
const SCORE_SUBSTRING: f64 = 20.0;

// Per-field weights; message matches count the most.
const WEIGHT_MESSAGE: f64 = 3.0;
const WEIGHT_ADDRESS: f64 = 2.0;
const WEIGHT_TAG: f64 = 1.0;

// Recency boost for transactions younger than seven days.
const RECENCY_BOOST: f64 = 1.25;

/// A scored search match.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub tx: EnrichedTransaction,
    pub score: f64,
}

fn match_score(haystack: &str, needle: &str) -> f64 {
    let haystack = haystack.to_lowercase();
    if haystack == needle {
        return SCORE_EXACT;
    }
    if haystack.starts_with(needle) {
        return SCORE_PREFIX;
    }
    if haystack
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == needle)
    {
        return SCORE_WORD;
    }
    if haystack.contains(needle) {
        return SCORE_SUBSTRING;
    }
    0.0
}

/// Score one candidate against the query; zero means no field matched.
fn score_candidate(tx: &EnrichedTransaction, needle: &str) -> f64 {
    let mut score = 0.0;
    if let Some(message) = &tx.record.message {
        score += WEIGHT_MESSAGE * match_score(message, needle);
    }
    score += WEIGHT_ADDRESS * match_score(&tx.record.address, needle);
    score += WEIGHT_TAG
        * tx.tags
            .iter()
            .map(|t| match_score(t, needle))
            .fold(0.0, f64::max);
    if score > 0.0 && tx.age_ms < WEEK_MS {
        score *= RECENCY_BOOST;
    }
    score
}

/// Free-text search over candidates. Search is a filter as well as a
/// ranker: candidates that match nowhere are excluded entirely. Results
/// come back sorted by descending score, ties broken by newer timestamp.
pub fn search(candidates: &[EnrichedTransaction], query: &str) -> Vec<SearchHit> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let mut hits: Vec<SearchHit> = candidates
        .iter()
        .filter_map(|tx| {
            let score = score_candidate(tx, &needle);
            (score > 0.0).then(|| SearchHit {
                tx: tx.clone(),
                score,
            })
        })
        .collect();
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.tx.record.timestamp.cmp(&a.tx.record.timestamp))
    });
    hits
}

// ─── Regex Filter ───────────────────────────────────────────────────────────

/// Keep candidates whose message, address, or tags match the pattern.
/// Compilation is case-insensitive and happens once, before any scanning;
/// an invalid pattern fails fast with `InvalidInput`.
pub fn regex_filter(
    candidates: Vec<EnrichedTransaction>,
    pattern: &str,
) -> Result<Vec<EnrichedTransaction>, LedgerError> {
    let re = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| LedgerError::InvalidInput(format!("bad pattern {pattern:?}: {e}")))?;
    Ok(candidates
        .into_iter()
        .filter(|tx| {
            tx.record.message.as_deref().is_some_and(|m| re.is_match(m))
                || re.is_match(&tx.record.address)
                || tx.tags.iter().any(|t| re.is_match(t))
        })
        .collect())
}

// ─── Tag / Age / Fee-Ratio Filters ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMatch {
    #[default]
    Any,
    All,
}

pub fn tag_filter(
    candidates: Vec<EnrichedTransaction>,
    tags: &[String],
    mode: TagMatch,
) -> Vec<EnrichedTransaction> {
    if tags.is_empty() {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|tx| match mode {
            TagMatch::Any => tags.iter().any(|t| tx.has_tag(t)),
            TagMatch::All => tags.iter().all(|t| tx.has_tag(t)),
        })
        .collect()
}

pub fn max_age_filter(
    candidates: Vec<EnrichedTransaction>,
    max_age_ms: u64,
) -> Vec<EnrichedTransaction> {
    candidates
        .into_iter()
        .filter(|tx| tx.age_ms <= max_age_ms)
        .collect()
}

/// Keep candidates whose fee/amount ratio is at least `min_ratio`.
/// Zero-amount records are excluded outright rather than divided by zero.
pub fn min_fee_ratio_filter(
    candidates: Vec<EnrichedTransaction>,
    min_ratio: f64,
) -> Vec<EnrichedTransaction> {
    candidates
        .into_iter()
        .filter(|tx| {
            if tx.record.amount.is_zero() {
                return false;
            }
            let ratio = tx.record.fee.as_micro() as f64 / tx.record.amount.as_micro() as f64;
            ratio >= min_ratio
        })
        .collect()
}

// ─── Custom Predicates ──────────────────────────────────────────────────────

/// Caller-supplied predicate. Fallible: the first error fails the whole
/// query, since a half-applied predicate would silently skew totals.
pub type CustomPredicate<'a> =
    &'a dyn Fn(&EnrichedTransaction) -> Result<bool, LedgerError>;

pub fn apply_predicate(
    candidates: Vec<EnrichedTransaction>,
    predicate: CustomPredicate<'_>,
) -> Result<Vec<EnrichedTransaction>, LedgerError> {
    let mut kept = Vec::with_capacity(candidates.len());
    for tx in candidates {
        if predicate(&tx)? {
            kept.push(tx);
        }
    }
    Ok(kept)
}

// ─── Filter Validation ──────────────────────────────────────────────────────

/// Advisory output of [`validate_filter`]: an estimate of the fraction of
/// the store a filter will return (1.0 = everything), plus warnings.
/// Never blocks execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterReport {
    pub selectivity: f64,
    pub warnings: Vec<String>,
}

pub fn validate_filter(filter: &TransactionFilter) -> FilterReport {
    let mut selectivity = 1.0;
    if filter.address.is_some() {
        selectivity *= 0.05;
    }
    if let Some(statuses) = &filter.status {
        if !statuses.is_empty() {
            selectivity *= statuses.len() as f64 / TxStatus::ALL.len() as f64;
        }
    }
    if let Some(directions) = &filter.direction {
        if !directions.is_empty() {
            selectivity *= directions.len() as f64 / 2.0;
        }
    }
    if filter.min_timestamp.is_some() || filter.max_timestamp.is_some() {
        selectivity *= 0.5;
    }
    if filter.min_amount.is_some() || filter.max_amount.is_some() {
        selectivity *= 0.5;
    }

    let mut warnings = Vec::new();
    if selectivity >= 0.8 {
        warnings.push("filter is likely to return most of the store".to_string());
    }
    FilterReport {
        selectivity,
        warnings,
    }
}
