//! Token-gated reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                   TOKEN GATE PROXY                   │
//!                    │                                                      │
//!  Client Request    │  ┌─────────┐   ┌──────────┐   ┌──────────────────┐   │
//!  ──────────────────┼─▶│  token  │──▶│  target  │──▶│ header sanitizer │   │
//!                    │  │  gate   │   │ resolver │   │ + credential     │   │
//!                    │  └─────────┘   └──────────┘   └────────┬─────────┘   │
//!                    │                                        ▼             │
//!  Client Response   │  ┌──────────┐   ┌──────────┐   ┌──────────────┐      │
//!  ◀─────────────────┼──│ response │◀──│  relay   │◀──│   upstream   │◀─────┼── Upstream
//!                    │  │  writer  │   │ cap+gzip │   │  dispatcher  │      │   (HTTPS)
//!                    │  └──────────┘   └──────────┘   └──────────────┘      │
//!                    │                                                      │
//!                    │    config · logging · metrics · graceful shutdown    │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use token_gate_proxy::config::load_config;
use token_gate_proxy::lifecycle::{signals, Shutdown};
use token_gate_proxy::observability::{logging, metrics};
use token_gate_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "token-gate-proxy")]
#[command(
    about = "Authenticating reverse proxy with upstream credential injection",
    long_about = None
)]
struct Cli {
    /// Optional TOML configuration file. Environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listening port, overriding file and environment.
    #[arg(short, long)]
    port: Option<u16>,

    /// Load and validate configuration, print it with secrets redacted, and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.listener.port = port;
    }

    if cli.check {
        println!("{}", toml::to_string_pretty(&config.redacted())?);
        return Ok(());
    }

    logging::init_logging(&config.observability);

    tracing::info!("token-gate-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                );
            }
        }
    }

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Proxy server running");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
