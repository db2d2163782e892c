// src/config/credentials.rs
use std::env;
use std::fmt;

use crate::error::DigestError;

pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_SERVERCHAN_KEY: &str = "SERVERCHAN_KEY";

/// Secrets required by a full run. `Debug` never prints the values.
#[derive(Clone)]
pub struct Credentials {
    pub gemini_api_key: String,
    pub serverchan_key: String,
}

impl Credentials {
    /// Both variables must be present and non-blank.
    pub fn from_env() -> Result<Self, DigestError> {
        Ok(Self {
            gemini_api_key: required(ENV_GEMINI_API_KEY)?,
            serverchan_key: required(ENV_SERVERCHAN_KEY)?,
        })
    }
}

fn required(name: &'static str) -> Result<String, DigestError> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(DigestError::MissingCredential(name)),
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("gemini_key_len", &self.gemini_api_key.len())
            .field("serverchan_key_len", &self.serverchan_key.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[serial_test::serial]
    #[test]
    fn missing_or_blank_keys_are_reported_by_name() {
        env::remove_var(ENV_GEMINI_API_KEY);
        env::set_var(ENV_SERVERCHAN_KEY, "SCT123");
        match Credentials::from_env() {
            Err(DigestError::MissingCredential(n)) => assert_eq!(n, ENV_GEMINI_API_KEY),
            other => panic!("unexpected: {other:?}"),
        }

        env::set_var(ENV_GEMINI_API_KEY, "g-key");
        env::set_var(ENV_SERVERCHAN_KEY, "   ");
        match Credentials::from_env() {
            Err(DigestError::MissingCredential(n)) => assert_eq!(n, ENV_SERVERCHAN_KEY),
            other => panic!("unexpected: {other:?}"),
        }

        env::set_var(ENV_SERVERCHAN_KEY, " SCT123 ");
        let c = Credentials::from_env().unwrap();
        assert_eq!(c.serverchan_key, "SCT123");
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("g-key"), "debug output leaks secret: {dbg}");

        env::remove_var(ENV_GEMINI_API_KEY);
        env::remove_var(ENV_SERVERCHAN_KEY);
    }
}
