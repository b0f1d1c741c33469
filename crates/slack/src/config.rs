use std::time::Duration;

use {
    recall_common::RetryPolicy,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

pub const DEFAULT_API_URL: &str = "https://slack.com/api";

/// Configuration for the Slack side of the bridge.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackAccountConfig {
    /// Bot token (xoxb-...).
    #[serde(serialize_with = "serialize_secret")]
    pub bot_token: Secret<String>,

    /// App-level token (xapp-...) used to open Socket Mode connections.
    #[serde(serialize_with = "serialize_secret")]
    pub app_token: Secret<String>,

    /// Web API base URL.
    pub api_url: String,

    /// How long resolved user and channel names stay cached.
    pub identity_ttl_secs: u64,

    /// Total attempts for retried Web API lookups.
    pub retry_attempts: u32,

    /// Pause between retried attempts (ms).
    pub retry_delay_ms: u64,

    /// Contact shown to users in error notices.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_contact: Option<String>,
}

impl SlackAccountConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_delay_ms),
        )
    }

    pub fn identity_ttl(&self) -> Duration {
        Duration::from_secs(self.identity_ttl_secs)
    }
}

impl std::fmt::Debug for SlackAccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackAccountConfig")
            .field("bot_token", &"[REDACTED]")
            .field("app_token", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .field("identity_ttl_secs", &self.identity_ttl_secs)
            .finish_non_exhaustive()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for SlackAccountConfig {
    fn default() -> Self {
        Self {
            bot_token: Secret::new(String::new()),
            app_token: Secret::new(String::new()),
            api_url: DEFAULT_API_URL.into(),
            identity_ttl_secs: 600,
            retry_attempts: 3,
            retry_delay_ms: 500,
            support_contact: None,
        }
    }
}
