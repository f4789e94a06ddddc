use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use release_relay::categorize::LlmCategorizer;
use release_relay::config::{AppConfig, load_subscriptions};
use release_relay::github::build_octocrab;
use release_relay::notify::TelegramNotifier;
use release_relay::persistence::JsonFileStore;
use release_relay::worker::{PollConfig, Relay, RelaySettings, run_forever};

/// Relays new GitHub releases and tags to Telegram.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Run a single pass and exit (non-zero if any subscription failed).
    #[arg(long)]
    once: bool,

    /// State file, overriding STATE_PATH.
    #[arg(long)]
    state_path: Option<PathBuf>,

    /// Subscription list, overriding SUBSCRIPTIONS_PATH.
    #[arg(long)]
    subscriptions: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "release_relay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut config = AppConfig::from_env()?;
    if let Some(path) = cli.state_path {
        config.state_path = path;
    }
    if let Some(path) = cli.subscriptions {
        config.subscriptions_path = path;
    }

    if config.github_token.is_none() {
        warn!("GITHUB_TOKEN not set, using unauthenticated GitHub API (60 requests/hour)");
    }

    let github = build_octocrab(config.github_token.as_deref(), &config.github_api_url)?;
    let http = reqwest::Client::builder()
        .user_agent(concat!("release-relay/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let store = JsonFileStore::new(config.state_path.clone());
    info!(
        state_path = %store.path().display(),
        subscriptions_path = %config.subscriptions_path.display(),
        timezone = %config.timezone,
        "Configuration loaded"
    );

    let relay = Relay::new(
        github,
        LlmCategorizer::new(http.clone(), config.llm.clone()),
        TelegramNotifier::new(
            http,
            config.telegram.api_url.clone(),
            config.telegram.bot_token.clone(),
            config.telegram.chat_id.clone(),
        ),
        store,
        RelaySettings {
            target_lang: config.llm.target_lang.clone(),
            timezone: config.timezone,
            notify_on_first_run: config.notify_on_first_run,
        },
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    if cli.once {
        let subscriptions = load_subscriptions(&config.subscriptions_path)?;
        let report = relay.run_once(&subscriptions, &shutdown).await?;
        return Ok(ExitCode::from(report.exit_code() as u8));
    }

    let subscriptions_path = config.subscriptions_path.clone();
    run_forever(
        &relay,
        || load_subscriptions(&subscriptions_path),
        &PollConfig::new(config.check_interval),
        shutdown,
    )
    .await?;
    Ok(ExitCode::SUCCESS)
}

/// Cancels `shutdown` on Ctrl-C or, on Unix, SIGTERM.
async fn cancel_on_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}
