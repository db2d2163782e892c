// src/probe.rs
//! Connectivity check for both external services. Never panics; each side is
//! reported separately.

use chrono::Local;
use tracing::{info, warn};

use crate::notify::{Message, Notifier};
use crate::summarize::{GenerationParams, TextGenerator};

const PROBE_PROMPT: &str = "Hello! Please respond with 'OK' if you can read this.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeReport {
    pub generator_ok: bool,
    pub notifier_ok: bool,
}

impl ProbeReport {
    pub fn all_ok(&self) -> bool {
        self.generator_ok && self.notifier_ok
    }
}

pub async fn run_probe(
    generator: &dyn TextGenerator,
    params: &GenerationParams,
    notifier: &dyn Notifier,
) -> ProbeReport {
    let generator_ok = match generator.generate(PROBE_PROMPT, params).await {
        Ok(text) => {
            info!(provider = generator.name(), reply = %crate::summarize::take_chars(&text, 100), "generator probe ok");
            true
        }
        Err(e) => {
            warn!(provider = generator.name(), error = ?e, "generator probe failed");
            false
        }
    };

    let msg = Message {
        title: "🧪 paper-digest test message".to_string(),
        body: format!(
            "Connectivity check from paper-digest at {}.",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ),
    };
    let notifier_ok = match notifier.send(&msg).await {
        Ok(receipt) => {
            info!(
                notifier = notifier.name(),
                push_id = receipt.push_id.as_deref().unwrap_or("n/a"),
                "notifier probe ok"
            );
            true
        }
        Err(e) => {
            warn!(notifier = notifier.name(), error = ?e, "notifier probe failed");
            false
        }
    };

    ProbeReport {
        generator_ok,
        notifier_ok,
    }
}
