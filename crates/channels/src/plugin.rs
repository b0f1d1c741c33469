use {async_trait::async_trait, serde::Deserialize};

use crate::Result;

/// Who the bot is on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub user_id: String,
    pub name: Option<String>,
}

/// One stored message as returned by a history page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryMessage {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: String,
    pub ts: String,
}

/// One page of a channel's history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryPage {
    pub messages: Vec<HistoryMessage>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// One page of the channels the bot is a member of.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelPage {
    pub channel_ids: Vec<String>,
    pub next_cursor: Option<String>,
}

/// Outbound calls the router needs from a chat platform.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// "Who am I" lookup for the bot token.
    async fn whoami(&self) -> Result<BotIdentity>;

    /// Display name of a user.
    async fn user_name(&self, user_id: &str) -> Result<String>;

    /// Display name of a channel.
    async fn channel_name(&self, channel_id: &str) -> Result<String>;

    async fn post_message(&self, channel_id: &str, text: &str) -> Result<()>;

    /// Fetch one page of history, starting at `cursor` (or the newest page).
    async fn history_page(&self, channel_id: &str, cursor: Option<&str>) -> Result<HistoryPage>;

    /// Fetch one page of the channels the bot belongs to.
    async fn member_channels(&self, cursor: Option<&str>) -> Result<ChannelPage>;

    /// Publish the bot's home view for a user.
    async fn publish_home(&self, user_id: &str, markdown: &str) -> Result<()>;
}

/// Delivery confirmation for a single inbound event.
#[async_trait]
pub trait EventAck: Send + Sync {
    async fn ack(&self) -> Result<()>;
}
