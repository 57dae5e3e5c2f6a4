use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use reposcope::config::Config;
use reposcope::observability::{self, LogFormat};

mod cmd;

#[derive(Parser)]
#[command(name = "reposcope")]
#[command(
    version,
    about = "Asynchronous code review and technical-debt analysis for GitHub repositories"
)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a TOML config file. Defaults to ./reposcope.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Root directory of the report store. Overrides store.root.
    #[arg(long, global = true)]
    pub store_root: Option<PathBuf>,

    /// Log output format: json or pretty
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP entry point with an in-process worker pool
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Start a run, wait for both reports, and print them
    Analyze {
        /// Repository URL, e.g. https://github.com/owner/name
        repo_url: String,

        /// Give up waiting after this many seconds
        #[arg(long, default_value = "150")]
        timeout_secs: u64,

        /// Seconds between status reads
        #[arg(long, default_value = "5")]
        interval_secs: u64,
    },
    /// Print the report status for a run, or for the latest reports
    Status {
        #[arg(long)]
        run_id: Option<String>,
    },
    /// Run a single worker job against the store
    Worker {
        #[command(subcommand)]
        command: WorkerCommands,
    },
}

#[derive(Subcommand, Clone)]
pub enum WorkerCommands {
    /// Sample repository code and publish a code review
    Review {
        #[arg(long)]
        run_id: String,

        /// Repository as owner/name
        #[arg(long)]
        repo_path: String,
    },
    /// Analyze the stored commit artifact and publish a technical-debt report
    Debt {
        #[arg(long)]
        run_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "reposcope=debug,info" } else { "info" };
    observability::init_logging(cli.log_format, level);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(root) = &cli.store_root {
        config.store.root = root.clone();
    }
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    match cli.command {
        Commands::Serve { host, port } => cmd::cmd_serve(config, host, port).await?,
        Commands::Analyze {
            repo_url,
            timeout_secs,
            interval_secs,
        } => cmd::cmd_analyze(config, &repo_url, timeout_secs, interval_secs).await?,
        Commands::Status { run_id } => cmd::cmd_status(config, run_id).await?,
        Commands::Worker { command } => cmd::cmd_worker(config, command).await?,
    }

    Ok(())
}
