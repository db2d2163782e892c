// src/rank.rs
//! Ranking: flag papers from allow-listed institutions and order the digest.
//!
//! - A paper is *priority* when any allow-list term occurs (case-insensitively) in
//!   its title, author names or abstract. Plain substring search: short acronyms
//!   such as "MIT" also hit words like "transmit".
//! - Order: priority first, then newer publish day first. The sort is stable, so
//!   papers sharing both keys keep their feed order.

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

use crate::ingest::types::Paper;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "digest_priority_total",
            "Papers flagged as coming from an allow-listed institution."
        );
    });
}

/// Text searched for allow-list terms.
fn haystack(p: &Paper) -> String {
    format!("{} {} {}", p.title, p.authors.join(" "), p.summary).to_lowercase()
}

/// Lowercase once so each paper is matched against prepared needles.
pub fn prepare_terms(terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn matches_any(p: &Paper, prepared: &[String]) -> bool {
    let text = haystack(p);
    prepared.iter().any(|t| text.contains(t.as_str()))
}

/// Set `is_priority` on every paper. Returns how many were flagged.
pub fn flag_priority(papers: &mut [Paper], terms: &[String]) -> usize {
    let prepared = prepare_terms(terms);
    let mut flagged = 0usize;
    for p in papers.iter_mut() {
        p.is_priority = matches_any(p, &prepared);
        if p.is_priority {
            flagged += 1;
        }
    }
    flagged
}

/// Stable sort: priority first, then publish day descending.
pub fn sort_by_priority(papers: &mut [Paper]) {
    papers.sort_by(|a, b| {
        b.is_priority
            .cmp(&a.is_priority)
            .then_with(|| b.published_day().cmp(&a.published_day()))
    });
}

/// Flag, sort and cap the list to `max_papers`.
pub fn select(mut papers: Vec<Paper>, terms: &[String], max_papers: usize) -> Vec<Paper> {
    ensure_metrics_described();
    let flagged = flag_priority(&mut papers, terms);
    sort_by_priority(&mut papers);
    counter!("digest_priority_total").increment(flagged as u64);
    tracing::info!(target: "rank", priority = flagged, total = papers.len(), "papers ranked");

    if papers.len() > max_papers {
        tracing::info!(target: "rank", from = papers.len(), to = max_papers, "capping paper count");
        papers.truncate(max_papers);
    }
    papers
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn paper(id: &str, title: &str, authors: &[&str], summary: &str, day: u32) -> Paper {
        Paper {
            source: "arxiv".into(),
            arxiv_id: id.into(),
            title: title.into(),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            summary: summary.into(),
            link: format!("http://arxiv.org/abs/{id}"),
            pdf_link: format!("http://arxiv.org/pdf/{id}"),
            published: Utc.with_ymd_and_hms(2026, 10, day, 8, 0, 0).unwrap(),
            categories: vec![],
            is_priority: false,
            analysis: None,
        }
    }

    fn terms(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn priority_iff_a_term_occurs_in_any_field() {
        let t = terms(&["ETH Zurich", "HKUST"]);
        let mut ps = vec![
            paper("a", "Flying at eth zurich", &[], "", 17),
            paper("b", "x", &["Jane (HKUST)"], "", 17),
            paper("c", "x", &[], "Work done at Hkust labs.", 17),
            paper("d", "Swiss lab", &["Zoe Zurich"], "ETH-like results", 17),
        ];
        let n = flag_priority(&mut ps, &t);
        assert_eq!(n, 3);
        assert_eq!(
            ps.iter().map(|p| p.is_priority).collect::<Vec<_>>(),
            vec![true, true, true, false]
        );
    }

    #[test]
    fn blank_terms_never_match() {
        let mut ps = vec![paper("a", "anything", &[], "", 17)];
        assert_eq!(flag_priority(&mut ps, &terms(&["  ", ""])), 0);
    }

    #[test]
    fn short_acronyms_match_inside_words() {
        // Known false positive: "MIT" inside "transmit".
        let mut ps = vec![paper("a", "Low-power transmitters for swarms", &[], "", 17)];
        assert_eq!(flag_priority(&mut ps, &terms(&["MIT"])), 1);
    }

    #[test]
    fn sort_is_stable_within_equal_keys() {
        let mut ps = vec![
            paper("old", "x", &[], "", 15),
            paper("n1", "x", &[], "", 17),
            paper("n2", "x", &[], "", 17),
            paper("p", "x", &[], "", 14),
            paper("n3", "x", &[], "", 17),
        ];
        ps[3].is_priority = true;
        sort_by_priority(&mut ps);
        let ids: Vec<_> = ps.iter().map(|p| p.arxiv_id.as_str()).collect();
        assert_eq!(ids, vec!["p", "n1", "n2", "n3", "old"]);
    }

    #[test]
    fn same_day_different_hours_keep_feed_order() {
        let mut early = paper("early", "x", &[], "", 17);
        early.published = Utc.with_ymd_and_hms(2026, 10, 17, 1, 0, 0).unwrap();
        let late = paper("late", "x", &[], "", 17);
        let mut ps = vec![early, late];
        sort_by_priority(&mut ps);
        assert_eq!(ps[0].arxiv_id, "early");
    }

    #[test]
    fn select_truncates_after_sorting() {
        let ps = vec![
            paper("a", "x", &[], "", 17),
            paper("b", "x", &[], "", 16),
            paper("c", "Stanford drones", &[], "", 10),
        ];
        let out = select(ps, &terms(&["stanford"]), 2);
        let ids: Vec<_> = out.iter().map(|p| p.arxiv_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }
}
