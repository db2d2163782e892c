use anyhow::{anyhow, Context, Result};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{Message, Notifier, PushReceipt};
use crate::config::NotifyConfig;
use crate::error::DigestError;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "digest_notify_attempts_total",
            "Webhook deliveries attempted, including retries."
        );
    });
}

/// ServerChan (WeChat push) webhook client.
/// The sendkey is part of the URL, so transport errors are stripped of it.
#[derive(Clone)]
pub struct ServerChanNotifier {
    url: String,
    client: Client,
    max_retries: u8,
    retry_delay: Duration,
}

#[derive(Debug, Deserialize)]
struct ServerChanResponse {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl ServerChanResponse {
    fn push_id(&self) -> Option<String> {
        match self.data.as_ref()?.get("pushid")? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl ServerChanNotifier {
    pub fn new(sendkey: &str, cfg: &NotifyConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .danger_accept_invalid_certs(cfg.accept_invalid_certs)
            .build()
            .context("building serverchan http client")?;
        if cfg.accept_invalid_certs {
            tracing::warn!(target: "notify", "TLS certificate verification disabled for push endpoint");
        }
        Ok(Self {
            url: format!("{}/{}.send", cfg.endpoint.trim_end_matches('/'), sendkey),
            client,
            max_retries: cfg.retries.max(1),
            retry_delay: Duration::from_secs(cfg.retry_delay_secs),
        })
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    async fn post_once(&self, msg: &Message) -> Result<PushReceipt> {
        let form = [("title", msg.title.as_str()), ("desp", msg.body.as_str())];
        let rsp = self
            .client
            .post(&self.url)
            .form(&form)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("serverchan request failed")?;
        let status = rsp.status();
        let text = rsp
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .context("serverchan body")?;
        let parsed: ServerChanResponse = serde_json::from_str(&text)
            .with_context(|| format!("serverchan returned {status} with non-JSON body"))?;

        if parsed.code == 0 {
            Ok(PushReceipt {
                push_id: parsed.push_id(),
                attempts: 0,
            })
        } else {
            Err(anyhow!(
                "serverchan rejected message: code={} message={}",
                parsed.code,
                parsed.message.as_deref().unwrap_or("unknown error")
            ))
        }
    }
}

#[async_trait::async_trait]
impl Notifier for ServerChanNotifier {
    async fn send(&self, msg: &Message) -> Result<PushReceipt> {
        ensure_metrics_described();
        let msg = msg.clone().fit_limits();
        tracing::info!(
            target: "notify",
            title = %msg.title,
            chars = msg.body.chars().count(),
            bytes = msg.body.len(),
            "sending digest"
        );

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            counter!("digest_notify_attempts_total").increment(1);
            match self.post_once(&msg).await {
                Ok(mut receipt) => {
                    receipt.attempts = attempt;
                    tracing::info!(
                        target: "notify",
                        attempt,
                        push_id = receipt.push_id.as_deref().unwrap_or("n/a"),
                        "push accepted"
                    );
                    return Ok(receipt);
                }
                Err(e) => {
                    let err = format!("{e:#}");
                    tracing::warn!(
                        target: "notify",
                        attempt,
                        retries = self.max_retries,
                        error = %err,
                        "push attempt failed"
                    );
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.retry_delay).await;
                        continue;
                    }
                    return Err(DigestError::NotifyExhausted {
                        attempts: attempt,
                        last: err,
                    }
                    .into());
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "serverchan"
    }
}
