pub mod render;
pub mod serverchan;

use anyhow::Result;

pub use render::compose;
pub use serverchan::ServerChanNotifier;

/// A rendered push message (Markdown body).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub title: String,
    pub body: String,
}

impl Message {
    /// Apply the push service's title/body limits.
    pub fn fit_limits(self) -> Self {
        Self {
            title: render::fit_title(&self.title),
            body: render::fit_body(self.body),
        }
    }
}

/// What the push service returned for an accepted message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReceipt {
    pub push_id: Option<String>,
    pub attempts: u8,
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, msg: &Message) -> Result<PushReceipt>;
    fn name(&self) -> &'static str;
}
