//! Slack Web API client.
//!
//! Every method is called as a form-encoded POST with a bearer token; the
//! `{"ok": false, "error": ...}` envelope is turned into a typed error.

use std::time::Duration;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, de::DeserializeOwned},
    serde_json::json,
    tracing::debug,
};

use recall_channels::{
    BotIdentity, ChannelPage, ChatPlatform, Error as ChannelError, HistoryMessage, HistoryPage,
    Result as ChannelResult,
};

use crate::config::DEFAULT_API_URL;

/// Page size for history and membership listings.
const PAGE_LIMIT: &str = "200";

pub struct SlackWebClient {
    client: reqwest::Client,
    token: Secret<String>,
    base_url: String,
}

impl SlackWebClient {
    pub fn new(token: Secret<String>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            token,
            base_url: DEFAULT_API_URL.into(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Open a Socket Mode session and return its WebSocket URL.
    pub async fn open_socket_url(&self, app_token: &Secret<String>) -> ChannelResult<String> {
        let opened: ConnectionsOpenResponse = self
            .call_with_token(app_token, "apps.connections.open", &[])
            .await?;
        Ok(opened.url)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> ChannelResult<T> {
        self.call_with_token(&self.token, method, params).await
    }

    async fn call_with_token<T: DeserializeOwned>(
        &self,
        token: &Secret<String>,
        method: &str,
        params: &[(&str, &str)],
    ) -> ChannelResult<T> {
        let response = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .bearer_auth(token.expose_secret())
            .form(params)
            .send()
            .await
            .map_err(|e| ChannelError::external(method, e))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(1);
            return Err(ChannelError::RateLimited {
                operation: method.to_string(),
                retry_after_secs,
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ChannelError::external(method, e))?;

        if !body["ok"].as_bool().unwrap_or(false) {
            let code = body["error"].as_str().unwrap_or("unknown_error");
            return Err(ChannelError::api(method, code));
        }
        debug!(method, "slack api call succeeded");
        Ok(serde_json::from_value(body)?)
    }
}

#[derive(Deserialize)]
struct ConnectionsOpenResponse {
    url: String,
}

#[derive(Deserialize)]
struct AuthTestResponse {
    user_id: String,
    #[serde(default)]
    user: Option<String>,
}

#[derive(Deserialize)]
struct UsersInfoResponse {
    user: SlackUser,
}

#[derive(Deserialize)]
struct SlackUser {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    profile: Option<SlackProfile>,
}

#[derive(Deserialize)]
struct SlackProfile {
    #[serde(default)]
    real_name: Option<String>,
}

impl SlackUser {
    /// `real_name`, then `profile.real_name`, then the handle.
    fn display_name(self) -> Option<String> {
        let profile_name = self.profile.and_then(|p| p.real_name);
        [self.real_name, profile_name, self.name]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())
    }
}

#[derive(Deserialize)]
struct ConversationsInfoResponse {
    channel: SlackChannel,
}

#[derive(Deserialize)]
struct SlackChannel {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize, Default)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

impl ResponseMetadata {
    fn cursor(self) -> Option<String> {
        self.next_cursor.filter(|c| !c.is_empty())
    }
}

#[derive(Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    messages: Vec<HistoryMessage>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Deserialize)]
struct UsersConversationsResponse {
    #[serde(default)]
    channels: Vec<SlackChannel>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Deserialize)]
struct Empty {}

#[async_trait]
impl ChatPlatform for SlackWebClient {
    async fn whoami(&self) -> ChannelResult<BotIdentity> {
        let auth: AuthTestResponse = self.call("auth.test", &[]).await?;
        Ok(BotIdentity {
            user_id: auth.user_id,
            name: auth.user,
        })
    }

    async fn user_name(&self, user_id: &str) -> ChannelResult<String> {
        let info: UsersInfoResponse = self.call("users.info", &[("user", user_id)]).await?;
        info.user
            .display_name()
            .ok_or_else(|| ChannelError::api("users.info", "user_has_no_name"))
    }

    async fn channel_name(&self, channel_id: &str) -> ChannelResult<String> {
        let info: ConversationsInfoResponse = self
            .call("conversations.info", &[("channel", channel_id)])
            .await?;
        Ok(info
            .channel
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or(info.channel.id))
    }

    async fn post_message(&self, channel_id: &str, text: &str) -> ChannelResult<()> {
        let _: Empty = self
            .call("chat.postMessage", &[("channel", channel_id), ("text", text)])
            .await?;
        Ok(())
    }

    async fn history_page(
        &self,
        channel_id: &str,
        cursor: Option<&str>,
    ) -> ChannelResult<HistoryPage> {
        let mut params = vec![("channel", channel_id), ("limit", PAGE_LIMIT)];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor));
        }
        let history: HistoryResponse = self.call("conversations.history", &params).await?;
        Ok(HistoryPage {
            messages: history.messages,
            has_more: history.has_more,
            next_cursor: history.response_metadata.and_then(ResponseMetadata::cursor),
        })
    }

    async fn member_channels(&self, cursor: Option<&str>) -> ChannelResult<ChannelPage> {
        let mut params = vec![
            ("types", "public_channel,private_channel"),
            ("exclude_archived", "false"),
            ("limit", PAGE_LIMIT),
        ];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor));
        }
        let listing: UsersConversationsResponse =
            self.call("users.conversations", &params).await?;
        Ok(ChannelPage {
            channel_ids: listing.channels.into_iter().map(|c| c.id).collect(),
            next_cursor: listing.response_metadata.and_then(ResponseMetadata::cursor),
        })
    }

    async fn publish_home(&self, user_id: &str, markdown: &str) -> ChannelResult<()> {
        let view = json!({
            "type": "home",
            "blocks": [
                {
                    "type": "section",
                    "text": { "type": "mrkdwn", "text": markdown },
                }
            ],
        })
        .to_string();
        let _: Empty = self
            .call("views.publish", &[("user_id", user_id), ("view", view.as_str())])
            .await?;
        Ok(())
    }
}
