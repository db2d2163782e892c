// src/ingest/arxiv.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;

use crate::config::FeedConfig;
use crate::ingest::normalize_text;
use crate::ingest::types::{FeedSource, Paper};

pub const SOURCE_ID: &str = "arxiv";

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<AtomAuthor>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: Option<String>,
}

/// arXiv stamps entries as `2024-01-15T17:59:59Z`; anything RFC 3339 is accepted too.
pub fn parse_timestamp(ts: &str) -> Result<DateTime<Utc>> {
    let ts = ts.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%SZ") {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("unparseable timestamp {ts:?}"))
}

fn entry_to_paper(entry: AtomEntry) -> Result<Paper> {
    let title = entry
        .title
        .as_deref()
        .map(normalize_text)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| anyhow!("entry without title"))?;
    let published = entry
        .published
        .as_deref()
        .ok_or_else(|| anyhow!("entry {title:?} has no published date"))
        .and_then(parse_timestamp)?;

    let id = entry.id.as_deref().map(str::trim).unwrap_or_default();
    let link = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .and_then(|l| l.href.clone())
        .unwrap_or_else(|| id.to_string());
    if link.is_empty() {
        return Err(anyhow!("entry {title:?} has neither id nor link"));
    }
    let arxiv_id = id.rsplit("/abs/").next().unwrap_or(id).to_string();

    Ok(Paper {
        source: SOURCE_ID.to_string(),
        arxiv_id,
        title,
        authors: entry
            .authors
            .into_iter()
            .filter_map(|a| a.name.map(|n| normalize_text(&n)))
            .filter(|n| !n.is_empty())
            .collect(),
        summary: entry.summary.as_deref().map(normalize_text).unwrap_or_default(),
        pdf_link: link.replace("/abs/", "/pdf/"),
        link,
        published,
        categories: entry.categories.into_iter().filter_map(|c| c.term).collect(),
        is_priority: false,
        analysis: None,
    })
}

/// Parse an Atom document. Broken entries are logged and skipped.
/// Returns the papers plus the number of skipped entries.
pub fn parse_feed(xml: &str) -> Result<(Vec<Paper>, usize)> {
    let t0 = std::time::Instant::now();
    let feed: AtomFeed = from_str(xml).context("parsing arxiv atom feed")?;

    let mut out = Vec::with_capacity(feed.entries.len());
    let mut skipped = 0usize;
    for entry in feed.entries {
        match entry_to_paper(entry) {
            Ok(p) => out.push(p),
            Err(e) => {
                skipped += 1;
                tracing::warn!(error = %e, "skipping feed entry");
            }
        }
    }

    histogram!("digest_feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    counter!("digest_feed_entries_total").increment(out.len() as u64);
    counter!("digest_feed_parse_errors_total").increment(skipped as u64);
    Ok((out, skipped))
}

pub struct ArxivProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        client: reqwest::Client,
        endpoint: String,
        params: Vec<(&'static str, String)>,
        politeness_delay: Duration,
    },
}

impl ArxivProvider {
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_config(cfg: &FeedConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("paper-digest/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building feed http client")?;
        Ok(Self {
            mode: Mode::Http {
                client,
                endpoint: cfg.endpoint.clone(),
                params: request_params(cfg),
                politeness_delay: Duration::from_secs(cfg.politeness_delay_secs),
            },
        })
    }
}

/// Query string parameters of the feed request.
pub fn request_params(cfg: &FeedConfig) -> Vec<(&'static str, String)> {
    vec![
        (
            "search_query",
            crate::ingest::build_query(&cfg.topic_terms, &cfg.focus_terms, &cfg.categories),
        ),
        ("sortBy", "submittedDate".to_string()),
        ("sortOrder", "descending".to_string()),
        ("max_results", cfg.max_results.to_string()),
    ]
}

#[async_trait]
impl FeedSource for ArxivProvider {
    async fn fetch_latest(&self) -> Result<Vec<Paper>> {
        let body = match &self.mode {
            Mode::Fixture(s) => s.clone(),
            Mode::Http {
                client,
                endpoint,
                params,
                politeness_delay,
            } => {
                // arXiv asks clients to leave a gap before each API call.
                tokio::time::sleep(*politeness_delay).await;
                tracing::info!(
                    target: "ingest",
                    query = %params[0].1,
                    "querying arxiv"
                );
                client
                    .get(endpoint)
                    .query(params)
                    .send()
                    .await
                    .context("arxiv http get()")?
                    .error_for_status()
                    .context("arxiv non-2xx")?
                    .text()
                    .await
                    .context("arxiv http .text()")?
            }
        };
        let (papers, _skipped) = parse_feed(&body)?;
        Ok(papers)
    }

    fn name(&self) -> &'static str {
        SOURCE_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_GOOD_ONE_BAD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query</title>
  <entry>
    <id>http://arxiv.org/abs/2610.01234v1</id>
    <published>2026-10-17T12:00:00Z</published>
    <title>Good
      Entry</title>
    <summary>  An abstract. </summary>
    <author><name>Ada Lovelace</name><arxiv:affiliation>MIT</arxiv:affiliation></author>
    <link href="http://arxiv.org/abs/2610.01234v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2610.01234v1" rel="related" type="application/pdf"/>
    <category term="cs.RO" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2610.09999v1</id>
    <published>yesterday-ish</published>
    <title>Bad date</title>
    <summary>x</summary>
  </entry>
</feed>"#;

    #[test]
    fn bad_entry_is_skipped_not_fatal() {
        let (papers, skipped) = parse_feed(ONE_GOOD_ONE_BAD).unwrap();
        assert_eq!(skipped, 1);
        assert_eq!(papers.len(), 1);
        let p = &papers[0];
        assert_eq!(p.title, "Good Entry");
        assert_eq!(p.summary, "An abstract.");
        assert_eq!(p.arxiv_id, "2610.01234v1");
        assert_eq!(p.pdf_link, "http://arxiv.org/pdf/2610.01234v1");
        assert_eq!(p.authors, vec!["Ada Lovelace".to_string()]);
        assert_eq!(p.categories, vec!["cs.RO".to_string()]);
        assert_eq!(p.source, SOURCE_ID);
        assert!(!p.is_priority);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(parse_feed("<feed><entry><title>oops</feed>").is_err());
    }

    #[test]
    fn timestamps_accept_arxiv_and_rfc3339() {
        let a = parse_timestamp("2026-10-17T12:00:00Z").unwrap();
        let b = parse_timestamp("2026-10-17T14:00:00+02:00").unwrap();
        assert_eq!(a, b);
        assert!(parse_timestamp("17/10/2026").is_err());
    }

    #[test]
    fn request_params_follow_config() {
        let cfg = FeedConfig {
            max_results: 42,
            ..FeedConfig::default()
        };
        let params = request_params(&cfg);
        assert_eq!(params[0].0, "search_query");
        assert!(params[0].1.starts_with("(all:UAV OR all:drone"));
        assert!(params.contains(&("sortBy", "submittedDate".to_string())));
        assert!(params.contains(&("max_results", "42".to_string())));
    }
}
