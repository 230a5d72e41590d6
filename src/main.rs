use anyhow::Context;
use clap::Parser;
use shreddit_core::{CoreError, ErrorExt, Settings, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str =
    "shreddit=info,deletion_driver=info,reddit_client=info,shreddit_core=info";

/// Edit and delete your old Reddit comments and submissions.
#[derive(Parser, Debug)]
#[command(name = "shreddit", version, about, long_about = None)]
struct Cli {
    /// Config file to use
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(Cli::parse()).await {
        tracing::error!("{}", failure_message(&e));
        std::process::exit(1);
    }
}

/// One line for a fatal error: the context chain, plus a hint when the cause is ours.
fn failure_message(error: &anyhow::Error) -> String {
    match error.downcast_ref::<CoreError>() {
        Some(cause) => format!("{:#} ({})", error, cause.user_friendly_message()),
        None => format!("{:#}", error),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    tracing::debug!("Loaded settings from {}", cli.config.display());

    deletion_driver::shred(&settings)
        .await
        .with_context(|| format!("Shredding u/{} failed", settings.credentials.username))?;

    Ok(())
}
