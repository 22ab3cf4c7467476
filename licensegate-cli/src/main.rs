//! Runs a license client until it locks or the user interrupts it.
//!
//! Usage:
//!   licensegate --server-url http://127.0.0.1:8080/licenses --license LIC-1 \
//!       --offline-limit-ms 1000 --auto-repeat-ms 300
//!
//! Settings can also come from a JSON file (`--config`); flags given on the
//! command line take precedence.

use anyhow::{Context, Result};
use clap::Parser;
use licensegate_client::{ClientConfig, LicenseClient};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "licensegate")]
#[command(about = "Keep checking a license against its authority")]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Authority entry point; empty disables checks
    #[arg(long)]
    server_url: Option<String>,

    /// License identifier
    #[arg(long)]
    license: Option<String>,

    /// How long to tolerate a missing confirmation (ms)
    #[arg(long)]
    offline_limit_ms: Option<u64>,

    /// Background check period (ms), 0 for on-demand checks only
    #[arg(long)]
    auto_repeat_ms: Option<u64>,

    /// How often to poll the client (ms)
    #[arg(long, default_value = "250")]
    poll_ms: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn build_config(args: &Args) -> Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ClientConfig::default(),
    };

    if let Some(server_url) = &args.server_url {
        config.server_url = server_url.clone();
    }
    if let Some(license) = &args.license {
        config.license = license.clone();
    }
    if let Some(ms) = args.offline_limit_ms {
        config.offline_limit_ms = ms;
    }
    if let Some(ms) = args.auto_repeat_ms {
        config.auto_repeat_ms = ms;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let config = build_config(&args)?;
    let client = LicenseClient::new(config);
    println!("{client}\n");

    let mut poll = tokio::time::interval(Duration::from_millis(args.poll_ms.max(1)));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            _ = poll.tick() => {
                if let Err(e) = client.check() {
                    warn!("License check failed: {}", e);
                    break;
                }
            }
        }
    }

    client.close();
    println!("{client}");

    Ok(if client.last_error().is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
