//! Normalization of Socket Mode payloads into [`ChatEvent`]s.
//!
//! This is the only place that knows the shape of Slack's event JSON. Every
//! event kind the router does not handle normalizes to `None`.

use {
    recall_channels::{ChatEvent, MessageEvent},
    serde::Deserialize,
    serde_json::Value,
};

use crate::error::{Context, Error, Result};

/// One frame received over the Socket Mode connection.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub envelope_id: Option<String>,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Fields shared by the inner event kinds we handle.
#[derive(Debug, Default, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    channel_type: Option<String>,
    #[serde(default)]
    files: Vec<Value>,
    /// Present on edited-message subtypes; carries the effective author/text.
    #[serde(default)]
    message: Option<NestedMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct NestedMessage {
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    files: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawCommand {
    command: String,
    channel_id: String,
    user_id: String,
    #[serde(default)]
    text: String,
}

const HANDLED_KINDS: &[&str] = &[
    "app_mention",
    "message",
    "member_joined_channel",
    "channel_left",
    "group_left",
    "member_left_channel",
    "channel_deleted",
    "group_deleted",
    "app_uninstalled",
    "app_home_opened",
];

/// Normalize an envelope's payload. `Ok(None)` means "nothing to route".
pub fn normalize(envelope: &Envelope) -> Result<Option<ChatEvent>> {
    match envelope.kind.as_str() {
        "events_api" => match envelope.payload.get("event") {
            Some(event) => normalize_event(event),
            None => Err(Error::message("events_api envelope without an event")),
        },
        "slash_commands" => normalize_command(&envelope.payload).map(Some),
        _ => Ok(None),
    }
}

/// Normalize the inner `event` object of an `events_api` payload.
pub fn normalize_event(event: &Value) -> Result<Option<ChatEvent>> {
    let kind = event.get("type").and_then(Value::as_str).unwrap_or_default();
    if !HANDLED_KINDS.contains(&kind) {
        return Ok(None);
    }
    let raw: RawEvent = serde_json::from_value(event.clone())?;

    let event = match raw.kind.as_str() {
        "app_mention" => ChatEvent::Mention(message_event(raw)?),
        "message" => ChatEvent::Message(message_event(raw)?),
        "member_joined_channel" => ChatEvent::MemberJoinedChannel {
            channel_id: required(raw.channel, "channel")?,
            user_id: required(raw.user, "user")?,
        },
        "channel_left" | "group_left" | "member_left_channel" => ChatEvent::ChannelOrGroupLeft {
            channel_id: required(raw.channel, "channel")?,
            user_id: raw.user,
        },
        "channel_deleted" | "group_deleted" => ChatEvent::ChannelOrGroupDeleted {
            channel_id: required(raw.channel, "channel")?,
        },
        "app_uninstalled" => ChatEvent::AppUninstalled,
        "app_home_opened" => ChatEvent::AppHomeOpened {
            user_id: required(raw.user, "user")?,
        },
        _ => return Ok(None),
    };
    Ok(Some(event))
}

/// Normalize a `slash_commands` payload.
pub fn normalize_command(payload: &Value) -> Result<ChatEvent> {
    let raw: RawCommand = serde_json::from_value(payload.clone())?;
    Ok(ChatEvent::SlashCommand {
        command: raw.command,
        channel_id: raw.channel_id,
        user_id: raw.user_id,
        text: raw.text,
    })
}

fn message_event(raw: RawEvent) -> Result<MessageEvent> {
    let nested = raw.message.unwrap_or_default();
    let user_id = raw.user.filter(|u| !u.is_empty()).or(nested.user);
    let text = raw
        .text
        .filter(|t| !t.is_empty())
        .or(nested.text)
        .unwrap_or_default();

    Ok(MessageEvent {
        channel_id: required(raw.channel, "channel")?,
        user_id,
        text,
        timestamp: raw.ts.unwrap_or_default(),
        is_direct_message: raw.channel_type.as_deref() == Some("im"),
        has_attachments: !raw.files.is_empty() || !nested.files.is_empty(),
    })
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value.with_context(|| format!("event is missing `{field}`"))
}
