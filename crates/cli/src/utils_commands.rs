//! CLI maintenance commands that run one bridge operation and exit.

use std::sync::Arc;

use {
    clap::Subcommand,
    recall_channels::ChatPlatform,
    recall_memory::{HttpMemoryEngine, MemoryEngine},
    recall_slack::{HistoryBackfill, IdentityResolver, SlackWebClient},
};

use crate::settings::EnvArgs;

#[derive(Subcommand)]
pub enum UtilsAction {
    /// Show which Slack bot the token belongs to.
    Whoami,
    /// Learn a channel's full message history now.
    Backfill {
        /// Channel id (C... or G...).
        channel: String,
    },
    /// Forget everything learned from a channel.
    Erase {
        /// Channel id (C... or G...).
        channel: String,
    },
    /// Resolve a Slack user id to its display name.
    ResolveUser {
        /// User id (U... or W...).
        user_id: String,
    },
}

pub async fn handle_utils(action: UtilsAction, env: &EnvArgs) -> anyhow::Result<()> {
    match action {
        UtilsAction::Whoami => {
            let web = slack_client(env)?;
            let me = web.whoami().await?;
            println!("User id: {}", me.user_id);
            println!("Name:    {}", me.name.as_deref().unwrap_or("-"));
        },
        UtilsAction::Backfill { channel } => {
            let slack = env.require_slack()?;
            let engine = Arc::new(HttpMemoryEngine::new(&env.require_memory()?)?);
            let web: Arc<dyn ChatPlatform> = Arc::new(slack_client(env)?);
            let identities = Arc::new(IdentityResolver::new(
                Arc::clone(&web),
                slack.identity_ttl(),
                slack.retry_policy(),
            ));
            let backfill = HistoryBackfill::new(web, engine, identities, slack.retry_policy());
            let records = backfill.run(&channel).await?;
            println!("Learned {records} messages from {channel}.");
        },
        UtilsAction::Erase { channel } => {
            let engine = HttpMemoryEngine::new(&env.require_memory()?)?;
            engine.erase_conversation(&channel).await?;
            println!("Forgot conversation {channel}.");
        },
        UtilsAction::ResolveUser { user_id } => {
            let slack = env.require_slack()?;
            let identities = IdentityResolver::new(
                Arc::new(slack_client(env)?),
                slack.identity_ttl(),
                slack.retry_policy(),
            );
            println!("{}", identities.resolve_user(&user_id).await?);
        },
    }
    Ok(())
}

pub fn slack_client(env: &EnvArgs) -> anyhow::Result<SlackWebClient> {
    let slack = env.require_slack()?;
    Ok(SlackWebClient::new(slack.bot_token)?.with_base_url(slack.api_url))
}
