pub mod cli;
pub mod cmd;
pub mod error;
pub mod fs;
pub mod lvm;

use anyhow::Result;
use clap::Parser as _;
use cmd::IntoCommand as _;
use shadow_rs::shadow;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

shadow!(build);

pub async fn run() -> Result<()> {
    // The image itself may go to stdout, so logs always go to stderr.
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = cli::Cli::parse();

    tracing::debug!(
        "lvmimg version: v{}  commit: {}",
        build::PKG_VERSION,
        build::COMMIT_HASH
    );

    // Handle the command
    args.into_command().run().await?;

    Ok(())
}
