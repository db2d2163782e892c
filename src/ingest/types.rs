// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};

/// Result of the summarization stage for one paper.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Analysis {
    pub text: String,
    /// `false` when `text` is the canned fallback.
    pub success: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct Paper {
    pub source: String, // e.g. "arxiv"
    pub arxiv_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String, // normalized abstract
    pub link: String,
    pub pdf_link: String,
    pub published: DateTime<Utc>,
    pub categories: Vec<String>,
    pub is_priority: bool,
    pub analysis: Option<Analysis>,
}

impl Paper {
    /// Day granularity used for ordering and display.
    pub fn published_day(&self) -> NaiveDate {
        self.published.date_naive()
    }

    pub fn analysis_succeeded(&self) -> bool {
        self.analysis.as_ref().is_some_and(|a| a.success)
    }
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Paper>>;
    fn name(&self) -> &'static str;
}
