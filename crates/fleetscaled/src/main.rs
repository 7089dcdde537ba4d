//! fleetscaled — elastic node-pool autoscaler daemon.
//!
//! # Usage
//!
//! ```text
//! fleetscaled run --config /etc/fleetscale/fleetscale.toml [--label batch]
//! fleetscaled submit --config fleetscale.toml --cmd "render --frame 7"
//! fleetscaled check-config --config fleetscale.toml
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use fleetscale_state::{SystemClock, TaskMessage};
use fleetscaled::config::BrokerConfig;
use fleetscaled::{BrokerHandle, Config, Daemon, submit_task};

const DEFAULT_LOG_FILTER: &str = "info,fleetscaled=debug,fleetscale=debug";

#[derive(Parser)]
#[command(name = "fleetscaled", about = "Elastic node-pool autoscaler")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run the autoscaler and status ingestor for one labeled pool.
    Run {
        /// Path to fleetscale.toml.
        #[arg(long)]
        config: PathBuf,

        /// Override `cluster.label`.
        #[arg(long)]
        label: Option<String>,
    },

    /// Publish one task to the tasks queue.
    Submit {
        #[arg(long)]
        config: PathBuf,

        /// Command line for the worker to execute.
        #[arg(long)]
        cmd: String,

        /// Task id (random UUID when omitted).
        #[arg(long)]
        id: Option<String>,
    },

    /// Parse and validate a configuration file.
    CheckConfig {
        #[arg(long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Run { config, label } => run(&config, label).await,
        Command::Submit { config, cmd, id } => submit(&config, cmd, id).await,
        Command::CheckConfig { config } => check_config(&config),
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

async fn run(path: &Path, label: Option<String>) -> anyhow::Result<()> {
    let config = Config::from_file(path)?.with_label(label)?;
    let daemon = Daemon::connect(&config, Arc::new(SystemClock)).await?;

    daemon
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to install Ctrl-C handler");
                std::future::pending::<()>().await;
            }
        })
        .await
}

async fn submit(path: &Path, cmdline: String, id: Option<String>) -> anyhow::Result<()> {
    let config = Config::from_file(path)?;
    if matches!(config.broker, BrokerConfig::Memory) {
        bail!("submit needs a shared broker; the in-memory broker lives inside the daemon");
    }

    let broker = BrokerHandle::connect(&config.broker).await?;
    let task = TaskMessage {
        task_id: id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        cmdline,
    };
    submit_task(broker.broker.as_ref(), &config.autoscale.task_queue, &task).await?;

    println!("{}", task.task_id);
    Ok(())
}

fn check_config(path: &Path) -> anyhow::Result<()> {
    let config = Config::from_file(path)?;
    let settings = config.scaler_settings()?;

    info!(
        label = %settings.label,
        max_nodes = settings.max_nodes,
        idle_timeout = ?settings.idle_timeout,
        startup_grace = ?settings.startup_grace,
        poll_interval = ?settings.poll_interval,
        "configuration ok"
    );
    println!("{}: ok", path.display());
    Ok(())
}
