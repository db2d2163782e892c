// src/config/mod.rs
//! Run configuration: TOML file with per-field defaults, plus credentials from env.

pub mod credentials;
pub mod institutions;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use credentials::Credentials;

use crate::error::DigestError;

pub const ENV_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/digest.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub feed: FeedConfig,
    pub rank: RankConfig,
    pub summarize: SummarizeConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub endpoint: String,
    /// Human-readable topic used in prompts and digest headings.
    pub topic: String,
    /// First synonym group (ORed).
    pub topic_terms: Vec<String>,
    /// Second synonym group (ORed, then ANDed with `topic_terms`).
    pub focus_terms: Vec<String>,
    /// Optional `cat:` restriction; empty means no category clause.
    pub categories: Vec<String>,
    pub lookback_days: u32,
    pub max_results: u32,
    pub politeness_delay_secs: u64,
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://export.arxiv.org/api/query".to_string(),
            topic: "UAV navigation".to_string(),
            topic_terms: strings(&[
                "UAV",
                "drone",
                "unmanned aerial vehicle",
                "quadrotor",
                "multirotor",
            ]),
            focus_terms: strings(&[
                "navigation",
                "path planning",
                "trajectory",
                "obstacle avoidance",
                "SLAM",
                "localization",
                "mapping",
                "motion planning",
                "autonomous flight",
            ]),
            categories: Vec::new(),
            lookback_days: 3,
            max_results: 100,
            politeness_delay_secs: 3,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankConfig {
    pub max_papers: usize,
    /// Explicit allow-list; when empty, `institutions::load_institutions_default` decides.
    pub institutions: Vec<String>,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            max_papers: 20,
            institutions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizeConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub retries: u8,
    pub retry_delay_secs: u64,
    /// Pause between two papers (rate limit of the free tier).
    pub request_delay_secs: u64,
    pub abstract_chars: usize,
    pub timeout_secs: u64,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.4,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 1024,
            retries: 3,
            retry_delay_secs: 5,
            request_delay_secs: 5,
            abstract_chars: 3000,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub endpoint: String,
    pub retries: u8,
    pub retry_delay_secs: u64,
    pub timeout_secs: u64,
    /// Skip TLS certificate verification for the push endpoint.
    pub accept_invalid_certs: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://sctapi.ftqq.com".to_string(),
            retries: 3,
            retry_delay_secs: 2,
            timeout_secs: 10,
            accept_invalid_certs: true,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl DigestConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: DigestConfig =
            toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Resolve the config file:
    /// 1) explicit path (CLI)
    /// 2) $DIGEST_CONFIG_PATH
    /// 3) config/digest.toml
    /// 4) built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(p) = explicit {
            return Self::load_from_file(p);
        }
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from_file(&pb);
            }
            return Err(DigestError::Config(format!(
                "{ENV_CONFIG_PATH} points to non-existent path {}",
                pb.display()
            ))
            .into());
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from_file(&fallback);
        }
        Ok(Self::default())
    }

    /// Clamp values that would make the run meaningless.
    fn sanitized(mut self) -> Self {
        if self.summarize.retries == 0 {
            self.summarize.retries = 1;
        }
        if self.notify.retries == 0 {
            self.notify.retries = 1;
        }
        if self.rank.max_papers == 0 {
            self.rank.max_papers = 1;
        }
        if !(0.0..=2.0).contains(&self.summarize.temperature) {
            self.summarize.temperature = SummarizeConfig::default().temperature;
        }
        if !(0.0..=1.0).contains(&self.summarize.top_p) {
            self.summarize.top_p = SummarizeConfig::default().top_p;
        }
        self
    }
}
