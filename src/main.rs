use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledfleet::scheduler::PatternKind;

mod commands;

#[derive(Parser)]
#[command(
    name = "ledfleet",
    version,
    about = "Leader-driven LED pattern scheduling across a fleet of nodes",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a fleet node
    Serve {
        /// TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Node name
        #[arg(short, long)]
        name: Option<String>,

        /// Bind address
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// URL other nodes use to reach this one
        #[arg(long)]
        advertise_url: Option<String>,

        /// Static leader name
        #[arg(long)]
        leader_name: Option<String>,

        /// Static leader URL
        #[arg(long)]
        leader_url: Option<String>,

        /// Pattern to run while leading
        #[arg(short, long)]
        pattern: Option<PatternKind>,

        /// Tick interval in milliseconds
        #[arg(long)]
        tick_interval_ms: Option<u64>,

        /// Sysfs LED brightness file
        #[arg(long)]
        led_path: Option<PathBuf>,

        /// Disable HTTP request logging
        #[arg(long, default_value = "false")]
        no_request_logging: bool,
    },

    /// Print the leader's per-host stats
    Stats {
        /// Leader base URL
        #[arg(short, long)]
        leader: String,

        /// Request timeout in milliseconds
        #[arg(long, default_value = "2000")]
        timeout_ms: u64,
    },

    /// Preview a pattern offline
    Pattern {
        /// Pattern name
        kind: PatternKind,

        /// Number of slots
        #[arg(short, long, default_value = "4")]
        count: usize,

        /// Number of steps to print
        #[arg(short, long, default_value = "8")]
        steps: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    match cli.command {
        Commands::Serve {
            config,
            name,
            bind,
            advertise_url,
            leader_name,
            leader_url,
            pattern,
            tick_interval_ms,
            led_path,
            no_request_logging,
        } => {
            tracing::info!(
                config = ?config,
                name = ?name,
                bind = ?bind,
                pattern = ?pattern,
                "Starting serve command"
            );
            commands::serve(commands::ServeParams {
                config,
                name,
                bind,
                advertise_url,
                leader_name,
                leader_url,
                pattern,
                tick_interval_ms,
                led_path,
                no_request_logging,
            })
            .await?;
        }

        Commands::Stats { leader, timeout_ms } => {
            tracing::debug!(leader = %leader, "Starting stats command");
            commands::stats(leader, timeout_ms).await?;
        }

        Commands::Pattern { kind, count, steps } => {
            commands::pattern(kind, count, steps)?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("ledfleet=debug,tower_http=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ledfleet=info,warn"))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
