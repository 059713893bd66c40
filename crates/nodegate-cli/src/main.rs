use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::OutputFormat;

#[derive(Parser)]
#[command(
    name = "nodegate",
    about = "nodegate — node-local admission control",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether this node may run a single candidate unit.
    ///
    /// Exits 0 when admitted and 2 when rejected.
    Check {
        /// Agent configuration (machine identity, probe, scheduled units)
        #[arg(short, long, default_value = "nodegate.toml")]
        config: PathBuf,
        /// Candidate unit description (TOML)
        #[arg(short, long)]
        job: PathBuf,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Admit a list of candidates in order, placing each one that fits.
    ///
    /// Later candidates see the units admitted before them.
    Plan {
        #[arg(short, long, default_value = "nodegate.toml")]
        config: PathBuf,
        /// File with a [[jobs]] array of unit descriptions (TOML)
        #[arg(short, long)]
        jobs: PathBuf,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

const DEFAULT_LOG_FILTER: &str = "nodegate=info";

/// RUST_LOG replaces the default filter outright; an unparsable value falls back to it.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            config,
            job,
            format,
        } => commands::check::check(&config, &job, format).await,
        Commands::Plan {
            config,
            jobs,
            format,
        } => commands::plan::plan(&config, &jobs, format).await,
    }
}
