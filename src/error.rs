//! Errors the binary has to tell apart when choosing an exit status.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DigestError {
    /// A required secret is absent from the environment.
    #[error("missing required environment variable {0}")]
    MissingCredential(&'static str),

    #[error("configuration error: {0}")]
    Config(String),

    /// Every delivery attempt to the webhook failed.
    #[error("notification was not delivered after {attempts} attempt(s): {last}")]
    NotifyExhausted { attempts: u8, last: String },
}
