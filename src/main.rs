//! edge-relay binary entrypoint.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use edge_relay::config::{loader, RelayConfig};
use edge_relay::http::HttpServer;
use edge_relay::lifecycle::Shutdown;
use edge_relay::observability::{logging, metrics};

#[derive(Parser)]
#[command(
    name = "edge-relay",
    about = "Edge-deployed HTTPS relay with per-session cookie isolation"
)]
struct Args {
    /// Path to a TOML configuration file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => loader::load_config(path)?,
        None => RelayConfig::default(),
    };

    logging::init(&config.observability.log_level);

    tracing::info!("edge-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        allow_origin = %config.cors.allow_origin,
        allow_insecure_http = config.upstream.allow_insecure_http,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
