// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod error;
pub mod ingest;
pub mod notify;
pub mod pipeline;
pub mod probe;
pub mod rank;
pub mod summarize;

// ---- Re-exports for stable public API ----
pub use crate::config::{Credentials, DigestConfig};
pub use crate::error::DigestError;
pub use crate::ingest::types::{Analysis, FeedSource, Paper};
pub use crate::notify::{Message, Notifier, PushReceipt};
pub use crate::pipeline::{Pipeline, RunReport};
pub use crate::summarize::{GenerationParams, Summarizer, TextGenerator};
