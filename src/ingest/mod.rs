// src/ingest/mod.rs
pub mod arxiv;
pub mod types;

use crate::ingest::types::{FeedSource, Paper};
use chrono::{DateTime, Duration, Utc};
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration.
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_feed_entries_total", "Entries parsed from the feed.");
        describe_counter!(
            "digest_feed_parse_errors_total",
            "Feed entries skipped because they could not be parsed."
        );
        describe_counter!(
            "digest_feed_stale_total",
            "Entries dropped for being older than the lookback window."
        );
        describe_counter!("digest_feed_errors_total", "Feed fetch/parse failures.");
        describe_histogram!("digest_feed_parse_ms", "Feed parse time in milliseconds.");
    });
}

/// Normalize feed text: decode entities, collapse whitespace, trim.
/// Abstracts carry inline math like `a<b`, so markup is left alone.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

fn query_term(field: &str, term: &str) -> String {
    if term.chars().any(char::is_whitespace) {
        format!("{field}:\"{term}\"")
    } else {
        format!("{field}:{term}")
    }
}

fn or_group(field: &str, terms: &[String]) -> Option<String> {
    let parts: Vec<String> = terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| query_term(field, t))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(format!("({})", parts.join(" OR ")))
    }
}

/// `(all:UAV OR all:"path planning" ...) AND (...)`, optionally `AND (cat:cs.RO OR ...)`.
/// Empty groups are left out.
pub fn build_query(topic_terms: &[String], focus_terms: &[String], categories: &[String]) -> String {
    [
        or_group("all", topic_terms),
        or_group("all", focus_terms),
        or_group("cat", categories),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" AND ")
}

/// Start of the recency window.
pub fn cutoff(now: DateTime<Utc>, lookback_days: u32) -> DateTime<Utc> {
    now - Duration::days(i64::from(lookback_days))
}

/// Drop papers published before `cutoff`. Returns (kept, dropped).
pub fn filter_recent(papers: Vec<Paper>, cutoff: DateTime<Utc>) -> (Vec<Paper>, usize) {
    let before = papers.len();
    let kept: Vec<Paper> = papers.into_iter().filter(|p| p.published >= cutoff).collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

/// Fetch from `source` and keep what falls inside the window.
/// A failing source is logged and yields an empty list.
pub async fn fetch_recent(source: &dyn FeedSource, cutoff: DateTime<Utc>) -> Vec<Paper> {
    ensure_metrics_described();

    let raw = match source.fetch_latest().await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = ?e, source = source.name(), "feed fetch failed");
            counter!("digest_feed_errors_total").increment(1);
            return Vec::new();
        }
    };

    let total = raw.len();
    let (kept, stale) = filter_recent(raw, cutoff);
    counter!("digest_feed_stale_total").increment(stale as u64);
    tracing::info!(
        target: "ingest",
        source = source.name(),
        total,
        kept = kept.len(),
        stale,
        cutoff = %cutoff.format("%Y-%m-%d %H:%M"),
        "feed fetched"
    );
    kept
}
