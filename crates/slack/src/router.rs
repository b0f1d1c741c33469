//! Dispatch of normalized events to reply, ingest, backfill, or erase.
//!
//! Every branch acknowledges the event before it touches anything else.
//! Failures are reported through the [`ErrorNotifier`] at this boundary and
//! handed back to the transport tagged with their error code.

use std::sync::Arc;

use {
    recall_channels::{ChatEvent, ChatPlatform, EventAck, MessageEvent},
    recall_common::{RetryPolicy, retry},
    recall_memory::{AssistantProfile, MemoryEngine, MemoryRecord},
    tokio::sync::OnceCell,
    tracing::{debug, error, info, warn},
};

use crate::{
    backfill::HistoryBackfill,
    config::SlackAccountConfig,
    error::{Context, Error, Result},
    format::format_message,
    identity::IdentityResolver,
    notify::ErrorNotifier,
};

/// Slack's own system pseudo-user.
pub const SLACKBOT_USER_ID: &str = "USLACKBOT";
/// Posted while the engine works on a reply.
pub const THINKING_PLACEHOLDER: &str = "...";
pub const SLASH_COMMAND_REPLY: &str = "Testing, testing, 1, 2, 3!";
pub const ATTACHMENTS_NOTE: &str =
    "\n\n_Note: I can't read attachments yet, so I only looked at the text of your message._";

/// What the router did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Replied,
    Ingested,
    Backfilled { records: usize },
    Erased { conversations: usize },
    Ignored(&'static str),
    HomePublished,
    Command(String),
}

pub struct EventRouter {
    platform: Arc<dyn ChatPlatform>,
    engine: Arc<dyn MemoryEngine>,
    identities: Arc<IdentityResolver>,
    backfill: HistoryBackfill,
    notifier: ErrorNotifier,
    profile: AssistantProfile,
    retry: RetryPolicy,
    bot_id: OnceCell<String>,
}

impl EventRouter {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        engine: Arc<dyn MemoryEngine>,
        profile: AssistantProfile,
        config: &SlackAccountConfig,
    ) -> Self {
        let retry = config.retry_policy();
        let identities = Arc::new(IdentityResolver::new(
            Arc::clone(&platform),
            config.identity_ttl(),
            retry,
        ));
        let backfill = HistoryBackfill::new(
            Arc::clone(&platform),
            Arc::clone(&engine),
            Arc::clone(&identities),
            retry,
        );
        let notifier = ErrorNotifier::new(Arc::clone(&platform), config.support_contact.clone());
        Self {
            platform,
            engine,
            identities,
            backfill,
            notifier,
            profile,
            retry,
            bot_id: OnceCell::new(),
        }
    }

    /// Route one event. Errors come back as [`Error::Reported`] after the
    /// notifier has logged them and told the originating channel.
    pub async fn handle(&self, event: &ChatEvent, ack: &dyn EventAck) -> Result<RouteOutcome> {
        let kind = event.kind();
        match self.dispatch(event, ack).await {
            Ok(outcome) => {
                debug!(kind, ?outcome, "event routed");
                Ok(outcome)
            },
            Err(e) => {
                let report = self.notifier.report(&e, event.channel_id()).await;
                Err(Error::Reported {
                    code: report.code,
                    source: Box::new(e),
                })
            },
        }
    }

    async fn dispatch(&self, event: &ChatEvent, ack: &dyn EventAck) -> Result<RouteOutcome> {
        ack.ack().await?;

        match event {
            ChatEvent::Mention(msg) => self.on_mention(msg).await,
            ChatEvent::Message(msg) => self.on_message(msg).await,
            ChatEvent::MemberJoinedChannel {
                channel_id,
                user_id,
            } => self.on_member_joined(channel_id, user_id).await,
            ChatEvent::ChannelOrGroupLeft {
                channel_id,
                user_id,
            } => self.on_left(channel_id, user_id.as_deref()).await,
            ChatEvent::ChannelOrGroupDeleted { channel_id } => {
                self.erase(channel_id).await?;
                Ok(RouteOutcome::Erased { conversations: 1 })
            },
            ChatEvent::AppUninstalled => self.on_uninstalled().await,
            ChatEvent::AppHomeOpened { user_id } => Ok(self.on_home_opened(user_id).await),
            ChatEvent::SlashCommand {
                command,
                channel_id,
                ..
            } => {
                info!(command = %command, channel_id = %channel_id, "running slash command");
                self.platform
                    .post_message(channel_id, SLASH_COMMAND_REPLY)
                    .await?;
                Ok(RouteOutcome::Command(SLASH_COMMAND_REPLY.to_string()))
            },
        }
    }

    /// The bot's user id, looked up once per process.
    async fn bot_id(&self) -> Result<&str> {
        let id = self
            .bot_id
            .get_or_try_init(|| self.identities.resolve_bot_id())
            .await?;
        Ok(id.as_str())
    }

    async fn on_mention(&self, msg: &MessageEvent) -> Result<RouteOutcome> {
        let author_id = msg.user_id.as_deref().context("mention without an author")?;

        self.platform
            .post_message(&msg.channel_id, THINKING_PLACEHOLDER)
            .await?;
        let reply = self.reply(msg, author_id).await?;
        self.platform.post_message(&msg.channel_id, &reply).await?;
        Ok(RouteOutcome::Replied)
    }

    async fn on_message(&self, msg: &MessageEvent) -> Result<RouteOutcome> {
        let Some(author_id) = msg.user_id.as_deref() else {
            return Ok(RouteOutcome::Ignored("message has no author"));
        };
        if msg.text.is_empty() {
            return Ok(RouteOutcome::Ignored("message has no text"));
        }
        if author_id == SLACKBOT_USER_ID {
            return Ok(RouteOutcome::Ignored("message from slackbot"));
        }
        let bot_id = self.bot_id().await?;
        if author_id == bot_id {
            return Ok(RouteOutcome::Ignored("message from the bot itself"));
        }
        if msg.text.contains(&format!("<@{bot_id}>")) {
            return Ok(RouteOutcome::Ignored("mention is handled separately"));
        }

        if msg.is_direct_message {
            self.platform
                .post_message(&msg.channel_id, THINKING_PLACEHOLDER)
                .await?;
            let mut reply = self.reply(msg, author_id).await?;
            if msg.has_attachments {
                reply.push_str(ATTACHMENTS_NOTE);
            }
            self.platform.post_message(&msg.channel_id, &reply).await?;
            return Ok(RouteOutcome::Replied);
        }

        let formatted =
            format_message(&self.identities, &msg.text, author_id, &msg.channel_id).await?;
        let record = MemoryRecord {
            conversation_id: msg.channel_id.clone(),
            author: formatted.author_name.clone(),
            timestamp: msg.timestamp.clone(),
            body: formatted.to_string(),
        };
        self.engine.learn(vec![record]).await?;
        debug!(channel_id = %msg.channel_id, ts = %msg.timestamp, "message learned");
        Ok(RouteOutcome::Ingested)
    }

    async fn reply(&self, msg: &MessageEvent, author_id: &str) -> Result<String> {
        let formatted =
            format_message(&self.identities, &msg.text, author_id, &msg.channel_id).await?;
        let reply = self
            .engine
            .chat_reply(&formatted.to_string(), &msg.channel_id)
            .await?;
        Ok(reply)
    }

    async fn on_member_joined(&self, channel_id: &str, user_id: &str) -> Result<RouteOutcome> {
        if user_id != self.bot_id().await? {
            return Ok(RouteOutcome::Ignored("another member joined"));
        }

        info!(channel_id, "joined channel");
        let greeting = format!(
            "Hello! I'm {}, a helpful AI assistant. To interact with me, just mention my name or \
             send me a direct message.",
            self.profile.name
        );
        self.platform.post_message(channel_id, &greeting).await?;

        match self.backfill.run(channel_id).await {
            Ok(records) => Ok(RouteOutcome::Backfilled { records }),
            Err(e) => {
                error!(channel_id, error = %e, "history backfill failed");
                Err(e)
            },
        }
    }

    async fn on_left(&self, channel_id: &str, user_id: Option<&str>) -> Result<RouteOutcome> {
        // channel_left/group_left are only delivered for the bot's own membership
        if let Some(user_id) = user_id
            && user_id != self.bot_id().await?
        {
            return Ok(RouteOutcome::Ignored("another member left"));
        }
        self.erase(channel_id).await?;
        Ok(RouteOutcome::Erased { conversations: 1 })
    }

    async fn on_uninstalled(&self) -> Result<RouteOutcome> {
        let mut channel_ids = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = retry(self.retry, "users.conversations", || {
                self.platform.member_channels(cursor.as_deref())
            })
            .await?;
            channel_ids.extend(page.channel_ids);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        info!(channels = channel_ids.len(), "app uninstalled, forgetting every channel");
        let mut failed = Vec::new();
        for channel_id in &channel_ids {
            if let Err(e) = self.erase(channel_id).await {
                warn!(channel_id = %channel_id, error = %e, "failed to erase conversation memory");
                failed.push(channel_id.as_str());
            }
        }
        if !failed.is_empty() {
            return Err(Error::message(format!(
                "failed to erase {} of {} conversations: {}",
                failed.len(),
                channel_ids.len(),
                failed.join(", ")
            )));
        }
        Ok(RouteOutcome::Erased {
            conversations: channel_ids.len(),
        })
    }

    async fn on_home_opened(&self, user_id: &str) -> RouteOutcome {
        match self
            .platform
            .publish_home(user_id, &self.profile.description)
            .await
        {
            Ok(()) => RouteOutcome::HomePublished,
            Err(e) => {
                warn!(user_id, error = %e, "failed to publish home tab");
                RouteOutcome::Ignored("home tab not published")
            },
        }
    }

    async fn erase(&self, channel_id: &str) -> Result<()> {
        retry(self.retry, "erase_conversation", || {
            self.engine.erase_conversation(channel_id)
        })
        .await?;
        info!(channel_id, "conversation memory erased");
        Ok(())
    }
}
