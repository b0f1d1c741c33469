//! Platform-neutral seam between a chat transport and the event router.
//!
//! A chat platform (Slack today) implements [`ChatPlatform`] for its outbound
//! Web API calls and normalizes its inbound payloads into [`ChatEvent`]s.

pub mod error;
pub mod event;
pub mod plugin;

pub use {
    error::{Error, Result},
    event::{ChatEvent, MessageEvent},
    plugin::{BotIdentity, ChannelPage, ChatPlatform, EventAck, HistoryMessage, HistoryPage},
};
