//! Credentials and endpoints read from the environment (or a `.env` file).

use {
    anyhow::{Context, bail},
    clap::Args,
    recall_memory::MemoryConfig,
    recall_slack::SlackAccountConfig,
    secrecy::Secret,
};

#[derive(Args, Default)]
pub struct EnvArgs {
    /// Memory engine API key.
    #[arg(long, global = true, env = "RECALL_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Assistant whose memory is read and written.
    #[arg(long, global = true, env = "RECALL_ASSISTANT_ID")]
    pub assistant_id: Option<String>,

    /// Memory engine base URL.
    #[arg(long, global = true, env = "RECALL_API_URL", default_value = recall_memory::config::DEFAULT_API_URL)]
    pub api_url: String,

    /// Slack bot token (xoxb-...).
    #[arg(long, global = true, env = "SLACK_BOT_TOKEN", hide_env_values = true)]
    pub slack_bot_token: Option<String>,

    /// Slack app-level token (xapp-...), needed for Socket Mode.
    #[arg(long, global = true, env = "SLACK_APP_TOKEN", hide_env_values = true)]
    pub slack_app_token: Option<String>,

    /// Slack Web API base URL.
    #[arg(long, global = true, env = "SLACK_API_URL", default_value = recall_slack::config::DEFAULT_API_URL)]
    pub slack_api_url: String,

    /// Contact shown to users when something goes wrong.
    #[arg(long, global = true, env = "RECALL_SUPPORT_CONTACT")]
    pub support_contact: Option<String>,
}

impl EnvArgs {
    /// Memory settings as given; empty where unset.
    pub fn memory_config(&self) -> MemoryConfig {
        MemoryConfig {
            api_url: self.api_url.clone(),
            api_key: Secret::new(self.api_key.clone().unwrap_or_default()),
            assistant_id: self.assistant_id.clone().unwrap_or_default(),
            ..Default::default()
        }
    }

    /// Memory settings, failing when the key or assistant is missing.
    pub fn require_memory(&self) -> anyhow::Result<MemoryConfig> {
        non_empty(self.api_key.as_deref()).context("RECALL_API_KEY is not set")?;
        non_empty(self.assistant_id.as_deref()).context("RECALL_ASSISTANT_ID is not set")?;
        Ok(self.memory_config())
    }

    /// Slack settings. The bot token is required; the app token only
    /// matters to `start`.
    pub fn require_slack(&self) -> anyhow::Result<SlackAccountConfig> {
        let bot_token =
            non_empty(self.slack_bot_token.as_deref()).context("SLACK_BOT_TOKEN is not set")?;
        Ok(SlackAccountConfig {
            bot_token: Secret::new(bot_token.to_string()),
            app_token: Secret::new(self.slack_app_token.clone().unwrap_or_default()),
            api_url: self.slack_api_url.clone(),
            support_contact: self.support_contact.clone(),
            ..Default::default()
        })
    }

    pub fn require_app_token(&self) -> anyhow::Result<Secret<String>> {
        match non_empty(self.slack_app_token.as_deref()) {
            Some(token) => Ok(Secret::new(token.to_string())),
            None => bail!("SLACK_APP_TOKEN is not set (Socket Mode needs an app-level token)"),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
