use serde::Serialize;

/// A message-like inbound event (a plain message or a mention of the bot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageEvent {
    pub channel_id: String,
    /// Effective author; `None` for authorless system messages.
    pub user_id: Option<String>,
    /// Effective text, already lifted out of nested edit payloads.
    pub text: String,
    /// Platform timestamp, kept verbatim (Slack `ts`).
    pub timestamp: String,
    pub is_direct_message: bool,
    pub has_attachments: bool,
}

/// Every inbound event kind the router understands.
///
/// Built once per payload by the transport's normalization step and dropped
/// after handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatEvent {
    Mention(MessageEvent),
    Message(MessageEvent),
    MemberJoinedChannel {
        channel_id: String,
        user_id: String,
    },
    /// The bot (or, when `user_id` is set, that user) left a channel or group.
    ChannelOrGroupLeft {
        channel_id: String,
        user_id: Option<String>,
    },
    ChannelOrGroupDeleted {
        channel_id: String,
    },
    AppUninstalled,
    AppHomeOpened {
        user_id: String,
    },
    SlashCommand {
        command: String,
        channel_id: String,
        user_id: String,
        text: String,
    },
}

impl ChatEvent {
    /// Short stable name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mention(_) => "mention",
            Self::Message(_) => "message",
            Self::MemberJoinedChannel { .. } => "member_joined_channel",
            Self::ChannelOrGroupLeft { .. } => "channel_or_group_left",
            Self::ChannelOrGroupDeleted { .. } => "channel_or_group_deleted",
            Self::AppUninstalled => "app_uninstalled",
            Self::AppHomeOpened { .. } => "app_home_opened",
            Self::SlashCommand { .. } => "slash_command",
        }
    }

    /// Channel the event originated from, when there is one to talk back to.
    pub fn channel_id(&self) -> Option<&str> {
        match self {
            Self::Mention(msg) | Self::Message(msg) => Some(&msg.channel_id),
            Self::MemberJoinedChannel { channel_id, .. }
            | Self::ChannelOrGroupLeft { channel_id, .. }
            | Self::ChannelOrGroupDeleted { channel_id }
            | Self::SlashCommand { channel_id, .. } => Some(channel_id),
            Self::AppUninstalled | Self::AppHomeOpened { .. } => None,
        }
    }
}
