use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use release_notifier::config::types::LogSettings;
use release_notifier::config::{LogFormat, Overrides, Settings, build_registry, loader};
use release_notifier::engine::{
    ChangeDetector, FirstObservation, PollScheduler, emitter, run_delivery_loop, shutdown_channel,
};
use release_notifier::github::{GitHubReleases, build_octocrab};
use release_notifier::notify::SlackSink;

#[derive(Parser)]
#[command(
    name = "release-notifier",
    version,
    about = "Watch GitHub repositories for new releases and post them to Slack"
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long, env = "RELEASE_NOTIFIER_CONFIG")]
    config: Option<PathBuf>,

    /// Repository to watch, as owner/name. Repeatable.
    #[arg(short = 'r', long = "repository", value_name = "OWNER/NAME")]
    repositories: Vec<String>,

    /// File listing one repository per line.
    #[arg(short = 'f', long = "file", env = "REPOSITORY_FILE")]
    repository_file: Option<PathBuf>,

    /// GitHub token used to query releases.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// GitHub API base URL (GitHub Enterprise).
    #[arg(long, env = "GITHUB_API_URL")]
    github_api: Option<String>,

    /// Poll interval, e.g. 30m or 1h.
    #[arg(short, long, env = "INTERVAL")]
    interval: Option<String>,

    /// Slack incoming-webhook URL.
    #[arg(long, env = "SLACK_HOOK", hide_env_values = true)]
    slack_hook: Option<String>,

    /// Log level: debug, info, warn or error.
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum)]
    log_format: Option<LogFormat>,

    /// What to report the first time a repository is seen.
    #[arg(long, value_enum)]
    first_observation: Option<FirstObservation>,
}

impl Cli {
    fn into_overrides(self) -> Overrides {
        Overrides {
            repositories: self.repositories,
            repository_file: self.repository_file,
            github_token: self.github_token,
            github_api: self.github_api,
            interval: self.interval,
            slack_hook: self.slack_hook,
            log_level: self.log_level,
            log_format: self.log_format,
            first_observation: self.first_observation,
        }
    }
}

fn init_tracing(log: &LogSettings) -> Result<()> {
    let filter = match EnvFilter::try_from_env("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&log.level)
            .with_context(|| format!("invalid log level {:?}", log.level))?,
    };
    match log.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
async fn termination_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    let file_config = loader::load_config(cli.config.as_deref())?;
    let settings = Settings::resolve(cli.into_overrides(), file_config)?;

    init_tracing(&settings.log)?;

    if let Some(level) = &settings.log.rejected_level {
        tracing::warn!(level = %level, "unknown log level, using info");
    }

    if let Err(e) = dotenv
        && !e.not_found()
    {
        tracing::warn!(error = %e, "failed to load .env file");
    }

    // Install the rustls CryptoProvider before any TLS client is constructed.
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow!("failed to install default CryptoProvider"))?;

    let registry = build_registry(&settings);
    tracing::info!(
        repositories = registry.len(),
        interval_ms = settings.interval.as_millis() as u64,
        "release-notifier starting"
    );

    let source = GitHubReleases::new(build_octocrab(&settings.github)?, settings.github.per_page);
    let sink = SlackSink::new(settings.slack_hook.clone()).context("building webhook client")?;
    if !sink.is_configured() {
        tracing::error!("missing Slack webhook URL; cannot create Slack notifications");
    }

    let (tx, releases) = emitter::channel(settings.channel_capacity);
    let detector = ChangeDetector::new(settings.first_observation, settings.include_prereleases);
    let scheduler = PollScheduler::new(source, registry, settings.interval, detector, tx);

    // The scheduler is the only emitter owner: once it returns, the delivery
    // loop drains what is left and ends.
    let (trigger, shutdown) = shutdown_channel();
    let poller = tokio::spawn(scheduler.run(shutdown));
    tokio::spawn(async move {
        termination_signal().await;
        tracing::info!("termination signal received, shutting down");
        trigger.trigger();
    });

    tracing::info!("waiting for new releases");
    let stats = run_delivery_loop(releases, &sink).await;
    poller.await.context("scheduler task panicked")?;

    tracing::info!(
        delivered = stats.delivered,
        failed = stats.failed,
        "release-notifier stopped"
    );
    Ok(())
}
