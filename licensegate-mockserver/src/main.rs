//! Mock license authority.
//!
//! Usage:
//!   licensegate-mockserver --port 8080 --revoke LIC-42
//!
//! Every license is valid unless revoked. Request `/quit` (or press Ctrl-C)
//! to stop the server.

use anyhow::{Context, Result};
use clap::Parser;
use licensegate_mockserver::{serve, MockState};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "licensegate-mockserver")]
#[command(about = "Mock license authority for licensegate clients")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// License to answer with 403 (repeatable)
    #[arg(long)]
    revoke: Vec<String>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("Starting mock server");
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port))
        .await
        .with_context(|| format!("Failed to bind port {}", args.port))?;
    info!(
        "Listening on {} ({} revoked)",
        listener.local_addr()?,
        args.revoke.len()
    );

    let state = MockState::new(args.revoke);

    tokio::select! {
        result = serve(listener, state.clone()) => result.context("Mock server failed")?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    info!("Mock server stopped after {} requests", state.requests());
    Ok(())
}
