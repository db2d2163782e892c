//! Summarizer: one prompt per paper, fixed retry budget, canned fallback.
//!
//! Papers are processed one at a time with a fixed pause between them; the free
//! Gemini tier allows 15 requests per minute.

pub mod gemini;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::config::SummarizeConfig;
use crate::ingest::types::{Analysis, Paper};

pub use gemini::GeminiProvider;

/// Sampling knobs sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl From<&SummarizeConfig> for GenerationParams {
    fn from(cfg: &SummarizeConfig) -> Self {
        Self {
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            top_k: cfg.top_k,
            max_output_tokens: cfg.max_output_tokens,
        }
    }
}

/// Low-level text generation backend. Separated so the retry/fallback policy
/// can run against a stub in tests.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;
    fn name(&self) -> &'static str;
}

pub type DynGenerator = Arc<dyn TextGenerator>;

/// Counts from one summarization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryStats {
    pub succeeded: usize,
    pub failed: usize,
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "digest_summaries_total",
            "Papers summarized, labelled by outcome (ok|fallback)."
        );
        describe_counter!(
            "digest_summary_attempts_total",
            "Generation requests sent, including retries."
        );
    });
}

/// First `max` chars of `s` (never splits a code point).
pub(crate) fn take_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub fn build_prompt(paper: &Paper, topic: &str, abstract_chars: usize) -> String {
    let mut authors = paper
        .authors
        .iter()
        .take(5)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if paper.authors.len() > 5 {
        authors.push_str(" et al.");
    }

    format!(
        "Analyze the following academic paper on {topic}. Answer concisely.\n\
\n\
Title: {title}\n\
\n\
Authors: {authors}\n\
\n\
Abstract:\n\
{summary}\n\
\n\
Extract:\n\
\n\
1. **Core problem** (1-2 sentences: the concrete problem or challenge addressed)\n\
\n\
2. **Key contributions** (3-5 points, one sentence each, focusing on technical and methodological novelty)\n\
\n\
Output rules:\n\
- use concise, professional language\n\
- do not restate the abstract\n\
- emphasize substantive contributions\n\
- no lead-ins such as \"According to the abstract\"\n\
\n\
Output format example:\n\
[Problem]\n\
Real-time obstacle avoidance for UAVs in dense clutter\n\
\n\
[Key contributions]\n\
1. An end-to-end deep reinforcement learning avoidance framework\n\
2. A lightweight 3D CNN for real-time perception\n\
3. A safety-constrained reward that keeps flight within limits\n",
        title = paper.title,
        summary = take_chars(&paper.summary, abstract_chars),
    )
}

/// Analysis used when every attempt failed.
pub fn fallback_analysis(paper: &Paper) -> String {
    format!(
        "[Problem]\n{}...\n\n[Key contributions]\n(AI analysis failed; see the original abstract)",
        take_chars(&paper.summary, 200)
    )
}

pub struct Summarizer {
    generator: DynGenerator,
    params: GenerationParams,
    topic: String,
    abstract_chars: usize,
    retries: u8,
    retry_delay: Duration,
    item_delay: Duration,
}

impl Summarizer {
    pub fn new(generator: DynGenerator, cfg: &SummarizeConfig, topic: &str) -> Self {
        Self {
            generator,
            params: GenerationParams::from(cfg),
            topic: topic.to_string(),
            abstract_chars: cfg.abstract_chars,
            retries: cfg.retries.max(1),
            retry_delay: Duration::from_secs(cfg.retry_delay_secs),
            item_delay: Duration::from_secs(cfg.request_delay_secs),
        }
    }

    pub fn with_delays(mut self, retry_delay: Duration, item_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self.item_delay = item_delay;
        self
    }

    /// Fill `paper.analysis`. Never fails: exhaustion yields the fallback.
    pub async fn summarize_one(&self, paper: &mut Paper) -> bool {
        ensure_metrics_described();
        let prompt = build_prompt(paper, &self.topic, self.abstract_chars);

        for attempt in 1..=self.retries {
            counter!("digest_summary_attempts_total").increment(1);
            let err = match self.generator.generate(&prompt, &self.params).await {
                Ok(text) if !text.trim().is_empty() => {
                    paper.analysis = Some(Analysis {
                        text: text.trim().to_string(),
                        success: true,
                    });
                    counter!("digest_summaries_total", "outcome" => "ok").increment(1);
                    return true;
                }
                Ok(_) => "empty response".to_string(),
                Err(e) => format!("{e:#}"),
            };

            tracing::warn!(
                target: "summarize",
                provider = self.generator.name(),
                attempt,
                retries = self.retries,
                error = %take_chars(&err, 100),
                "generation attempt failed"
            );
            if attempt < self.retries {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        paper.analysis = Some(Analysis {
            text: fallback_analysis(paper),
            success: false,
        });
        counter!("digest_summaries_total", "outcome" => "fallback").increment(1);
        false
    }

    /// Summarize every paper in order, pausing between papers.
    pub async fn summarize_all(&self, papers: &mut [Paper]) -> SummaryStats {
        let mut stats = SummaryStats::default();
        let total = papers.len();
        for (i, paper) in papers.iter_mut().enumerate() {
            tracing::info!(
                target: "summarize",
                index = i + 1,
                total,
                title = %take_chars(&paper.title, 60),
                "analyzing paper"
            );
            if self.summarize_one(paper).await {
                stats.succeeded += 1;
            } else {
                stats.failed += 1;
            }
            if i + 1 < total {
                tokio::time::sleep(self.item_delay).await;
            }
        }
        tracing::info!(
            target: "summarize",
            succeeded = stats.succeeded,
            total,
            "summarization finished"
        );
        stats
    }
}
