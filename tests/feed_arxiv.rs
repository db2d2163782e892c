// tests/feed_arxiv.rs
use chrono::{TimeZone, Utc};
use paper_digest::ingest::arxiv::{parse_feed, ArxivProvider};
use paper_digest::ingest::{cutoff, fetch_recent};
use paper_digest::FeedSource;
use std::fs;

fn fixture() -> String {
    fs::read_to_string("tests/fixtures/arxiv_atom.xml").expect("fixture")
}

#[tokio::test]
async fn parses_arxiv_fixture() {
    let p = ArxivProvider::from_fixture_str(&fixture());
    let papers = p.fetch_latest().await.expect("ok");

    assert_eq!(papers.len(), 4);
    assert!(papers.iter().all(|p| p.source == "arxiv"));
    assert!(papers.iter().all(|p| !p.is_priority && p.analysis.is_none()));

    let first = &papers[0];
    assert_eq!(first.arxiv_id, "2610.11111v1");
    assert_eq!(
        first.title,
        "Learning Obstacle Avoidance for Quadrotors in Cluttered Forests"
    );
    assert_eq!(first.authors, vec!["Alice Example", "Bob Example"]);
    assert!(first.summary.starts_with("We present"));
    assert!(first.summary.contains("Tracking error < 5 cm"));
    assert_eq!(first.link, "http://arxiv.org/abs/2610.11111v1");
    assert_eq!(first.pdf_link, "http://arxiv.org/pdf/2610.11111v1");
    assert_eq!(first.categories, vec!["cs.RO", "cs.CV"]);
}

#[test]
fn parse_feed_reports_no_skips_for_clean_fixture() {
    let (papers, skipped) = parse_feed(&fixture()).expect("parse");
    assert_eq!(papers.len(), 4);
    assert_eq!(skipped, 0);
}

#[tokio::test]
async fn fetch_recent_drops_entries_outside_window() {
    let p = ArxivProvider::from_fixture_str(&fixture());
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 6, 0, 0).unwrap();
    let kept = fetch_recent(&p, cutoff(now, 3)).await;

    assert_eq!(kept.len(), 3);
    assert!(kept.iter().all(|p| p.arxiv_id != "2610.00001v1"));
}

#[tokio::test]
async fn broken_feed_degrades_to_empty() {
    let p = ArxivProvider::from_fixture_str("<feed><entry><title>unterminated");
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 6, 0, 0).unwrap();
    assert!(fetch_recent(&p, cutoff(now, 3)).await.is_empty());
}
