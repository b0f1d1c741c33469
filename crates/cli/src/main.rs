mod settings;
mod utils_commands;

use std::sync::Arc;

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    recall_channels::ChatPlatform,
    recall_memory::{AssistantProfile, HttpMemoryEngine, MemoryEngine},
    recall_slack::{EventRouter, SlackAccountConfig, SlackWebClient, SocketModeClient},
    secrecy::Secret,
    tokio_util::sync::CancellationToken,
    tracing::{Instrument, info, info_span},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::settings::EnvArgs;

#[derive(Parser)]
#[command(
    name = "recall",
    about = "recall: Slack bridge to a long-term-memory assistant",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(flatten)]
    env: EnvArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Slack over Socket Mode and serve events until Ctrl-C.
    Start,
    /// One-off maintenance tasks.
    Utils {
        #[command(subcommand)]
        action: utils_commands::UtilsAction,
    },
}

fn init_telemetry(log_level: &str, json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let Cli {
        command,
        log_level,
        json_logs,
        env,
    } = Cli::parse();

    init_telemetry(&log_level, json_logs);

    // the key itself never reaches the logs, only its fingerprint
    let memory = env.memory_config();
    let span = info_span!(
        "recall",
        assistant_id = %memory.assistant_id,
        key = %memory.key_fingerprint()
    );

    async move {
        info!(version = env!("CARGO_PKG_VERSION"), "recall starting");
        match command {
            Commands::Start => start(&env).await,
            Commands::Utils { action } => utils_commands::handle_utils(action, &env).await,
        }
    }
    .instrument(span)
    .await
}

async fn start(env: &EnvArgs) -> anyhow::Result<()> {
    let slack = env.require_slack()?;
    let app_token = env.require_app_token()?;

    let engine = Arc::new(HttpMemoryEngine::new(&env.require_memory()?)?);
    let profile = engine
        .profile()
        .await
        .context("failed to load the assistant")?;
    info!(assistant = %profile.name, "assistant loaded");

    let web = Arc::new(utils_commands::slack_client(env)?);
    let me = web
        .whoami()
        .await
        .context("slack rejected the bot token")?;
    info!(bot_user_id = %me.user_id, bot_name = ?me.name, "slack bot authenticated");

    let client = socket_client(web, engine, profile, &slack, app_token);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl-C, shutting down");
            shutdown.cancel();
        }
    });

    client.run(cancel).await?;
    Ok(())
}

fn socket_client(
    web: Arc<SlackWebClient>,
    engine: Arc<dyn MemoryEngine>,
    profile: AssistantProfile,
    slack: &SlackAccountConfig,
    app_token: Secret<String>,
) -> SocketModeClient {
    let platform: Arc<dyn ChatPlatform> = web.clone();
    let router = EventRouter::new(platform, engine, profile, slack);
    SocketModeClient::new(web, app_token, router)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utils_subcommands_parse() {
        let cli = Cli::try_parse_from([
            "recall",
            "--log-level",
            "debug",
            "utils",
            "backfill",
            "C123",
        ])
        .unwrap();

        assert_eq!(cli.log_level, "debug");
        assert!(matches!(
            cli.command,
            Commands::Utils {
                action: utils_commands::UtilsAction::Backfill { ref channel }
            } if channel == "C123"
        ));
    }

    #[test]
    fn resolve_user_is_kebab_case() {
        let cli = Cli::try_parse_from(["recall", "utils", "resolve-user", "U1", "--json-logs"])
            .unwrap();
        assert!(cli.json_logs);
        assert!(matches!(
            cli.command,
            Commands::Utils {
                action: utils_commands::UtilsAction::ResolveUser { .. }
            }
        ));
    }

    #[test]
    fn socket_client_wires_the_web_client_into_the_router() {
        let env = EnvArgs {
            api_key: Some("key-1".into()),
            assistant_id: Some("asst-1".into()),
            slack_bot_token: Some("xoxb-1".into()),
            slack_app_token: Some("xapp-1".into()),
            ..Default::default()
        };
        let slack = env.require_slack().unwrap();
        let web = Arc::new(utils_commands::slack_client(&env).unwrap());
        let engine = Arc::new(HttpMemoryEngine::new(&env.require_memory().unwrap()).unwrap());
        let profile = AssistantProfile {
            name: "Sam".into(),
            description: String::new(),
        };

        let _client = socket_client(
            web,
            engine,
            profile,
            &slack,
            env.require_app_token().unwrap(),
        );
    }

    #[test]
    fn a_subcommand_is_required() {
        assert!(Cli::try_parse_from(["recall"]).is_err());
    }
}
