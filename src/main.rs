use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gitmirror::client::{DEFAULT_STATUS_URL, StatusClient};
use gitmirror::core::resolver::{GceMetadata, JobResolver, JobSource};
use gitmirror::core::{JobRegistry, Orchestrator};
use gitmirror::logging::{self, LogConfig};
use gitmirror::{config, context};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gitmirror")]
#[command(about = "Continuously mirror git repositories", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone every configured repository and keep mirroring it
    Daemon(ServerArgs),
    /// Query a running daemon's status endpoint
    Status(StatusArgs),
}

#[derive(Args, Serialize)]
struct ServerArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    bind_addr: Option<SocketAddr>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    work_root: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    default_branch: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    sync_interval_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    log_json: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    verbose: Option<bool>,
}

#[derive(Args)]
struct StatusArgs {
    #[arg(long, default_value = DEFAULT_STATUS_URL)]
    url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Daemon(args) => {
            let config = config::AppConfig::new(cli.config.as_deref(), Some(args))
                .context("Failed to load configuration")?;
            logging::init(LogConfig {
                json: config.log_json,
                verbose: config.verbose,
            });

            let registry = load_jobs(&config).await?;
            let ctx = context::AppContext::new(config, registry);
            run_daemon(ctx).await.context("Failed to start daemon")?
        }
        Commands::Status(args) => run_status(args)
            .await
            .context("Failed to check status of daemon")?,
    }

    Ok(())
}

async fn load_jobs(config: &config::AppConfig) -> Result<JobRegistry> {
    let source = JobSource::discover(config.jobs.clone(), |key| std::env::var(key).ok())?;
    let metadata = GceMetadata::new(config.metadata_base_url.clone());
    let specs = JobResolver::new(&metadata).resolve(source).await?;
    Ok(JobRegistry::new(specs)?)
}

async fn run_daemon(ctx: context::AppContext) -> Result<()> {
    Orchestrator::new(ctx).start().await
}

async fn run_status(args: &StatusArgs) -> Result<()> {
    let status = StatusClient::new(args.url.clone()).fetch().await?;
    print!("{}", status.body);

    if !status.healthy() {
        anyhow::bail!("daemon reports unhealthy (HTTP {})", status.code);
    }
    Ok(())
}
