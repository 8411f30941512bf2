//! Slack Mention Monitor CLI

use anyhow::Result;
use clap::Parser;
use slack_mention_monitor::cli::{self, Command, GlobalArgs};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "smm")]
#[command(about = "Slack Mention Monitor - watch a workspace for mentions that concern you")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity, e.g. RUST_LOG=debug smm watch
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("slack_mention_monitor=info,smm=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();
    cli::run(cli.global, cli.command).await
}
