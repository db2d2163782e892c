// src/pipeline.rs
//! Orchestrator: fetch -> rank -> summarize -> notify, strictly in sequence.
//!
//! Every stage degrades instead of failing the run: a broken feed becomes an empty
//! day, failed summaries become fallbacks. Only the final push decides the outcome.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDateTime, Utc};

use crate::config::{Credentials, DigestConfig};
use crate::ingest::{self, arxiv::ArxivProvider, types::FeedSource, types::Paper};
use crate::notify::{self, Message, Notifier, ServerChanNotifier};
use crate::rank;
use crate::summarize::{GeminiProvider, Summarizer};

/// Outcome of one run, logged at the end and mapped to the exit status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub fetched: usize,
    pub selected: usize,
    pub priority: usize,
    pub analyzed_ok: usize,
    pub notified: bool,
    pub push_id: Option<String>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.notified
    }
}

pub struct Pipeline {
    cfg: DigestConfig,
    institutions: Vec<String>,
    feed: Box<dyn FeedSource>,
    summarizer: Summarizer,
    notifier: Box<dyn Notifier>,
}

fn local_naive(now: DateTime<Utc>) -> NaiveDateTime {
    now.with_timezone(&Local).naive_local()
}

/// Fetch and rank, without touching the generative or push services.
/// Returns the number of fetched papers and the selected, ordered list.
pub async fn collect(
    feed: &dyn FeedSource,
    cfg: &DigestConfig,
    institutions: &[String],
    now: DateTime<Utc>,
) -> (usize, Vec<Paper>) {
    let cutoff = ingest::cutoff(now, cfg.feed.lookback_days);
    let fetched = ingest::fetch_recent(feed, cutoff).await;
    let count = fetched.len();
    if fetched.is_empty() {
        return (0, fetched);
    }
    (count, rank::select(fetched, institutions, cfg.rank.max_papers))
}

/// Render the digest for the current feed without summarizing or pushing.
pub async fn preview(
    feed: &dyn FeedSource,
    cfg: &DigestConfig,
    institutions: &[String],
    now: DateTime<Utc>,
) -> Message {
    let (_, selected) = collect(feed, cfg, institutions, now).await;
    notify::compose(&selected, &cfg.feed.topic, local_naive(now)).fit_limits()
}

impl Pipeline {
    pub fn new(
        cfg: DigestConfig,
        institutions: Vec<String>,
        feed: Box<dyn FeedSource>,
        summarizer: Summarizer,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            cfg,
            institutions,
            feed,
            summarizer,
            notifier,
        }
    }

    /// Production wiring: arXiv feed, Gemini, ServerChan.
    pub fn from_config(
        cfg: DigestConfig,
        creds: &Credentials,
        institutions: Vec<String>,
    ) -> Result<Self> {
        let feed = ArxivProvider::from_config(&cfg.feed)?;
        let generator = GeminiProvider::new(&creds.gemini_api_key, &cfg.summarize)?;
        tracing::info!(model = generator.model(), "gemini provider ready");
        let summarizer = Summarizer::new(Arc::new(generator), &cfg.summarize, &cfg.feed.topic);
        let notifier = ServerChanNotifier::new(&creds.serverchan_key, &cfg.notify)?;
        Ok(Self::new(
            cfg,
            institutions,
            Box::new(feed),
            summarizer,
            Box::new(notifier),
        ))
    }

    pub async fn run(&self, now: DateTime<Utc>) -> RunReport {
        let mut report = RunReport::default();
        let (fetched, mut selected) =
            collect(self.feed.as_ref(), &self.cfg, &self.institutions, now).await;
        report.fetched = fetched;

        if selected.is_empty() {
            tracing::warn!(target: "pipeline", "no papers found, sending empty-state notice");
        } else {
            report.selected = selected.len();
            report.priority = selected.iter().filter(|p| p.is_priority).count();
            let stats = self.summarizer.summarize_all(&mut selected).await;
            report.analyzed_ok = stats.succeeded;
        }

        let msg = notify::compose(&selected, &self.cfg.feed.topic, local_naive(now));
        match self.notifier.send(&msg).await {
            Ok(receipt) => {
                report.notified = true;
                report.push_id = receipt.push_id;
            }
            Err(e) => {
                tracing::error!(
                    target: "pipeline",
                    notifier = self.notifier.name(),
                    error = ?e,
                    "notification failed"
                );
            }
        }

        tracing::info!(
            target: "pipeline",
            fetched = report.fetched,
            selected = report.selected,
            priority = report.priority,
            analyzed_ok = report.analyzed_ok,
            notified = report.notified,
            push_id = report.push_id.as_deref().unwrap_or("n/a"),
            "run finished"
        );
        report
    }
}
