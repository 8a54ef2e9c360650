//! tcp-http demo server.
//!
//! ```text
//! config (TOML + CLI overrides)
//!     → logging / metrics
//!     → Server::start(DemoRouter)
//!     → wait for SIGINT / SIGTERM
//!     → close, drain accept loop
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use tcp_http::config::{load_config, validate_config, ServerConfig};
use tcp_http::lifecycle::signals::wait_for_signal;
use tcp_http::observability::{logging, metrics};
use tcp_http::{DemoRouter, Server};

#[derive(Debug, Parser)]
#[command(name = "tcp-http", version, about = "HTTP/1.1 server over raw TCP")]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the directory `/video` is served from.
    #[arg(long)]
    assets_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = cli.port {
        config.listener.port = port;
    }
    if let Some(dir) = cli.assets_dir {
        config.routes.assets_dir = dir;
    }
    validate_config(&config).map_err(|errors| {
        errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    })?;

    logging::init(&config.observability.log_level)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tcp-http starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    tracing::info!(
        host = %config.listener.host,
        port = config.listener.port,
        max_connections = config.listener.max_connections,
        max_buffer_size = config.limits.max_buffer_size,
        assets_dir = %config.routes.assets_dir.display(),
        "Configuration loaded"
    );

    let router = DemoRouter::new(config.routes.clone());
    let mut server = Server::start(&config, router.into_handler()).await?;
    tracing::info!(address = %server.local_addr(), "Server started");

    wait_for_signal().await;

    server.close();
    server.wait().await;
    tracing::info!("Server gracefully stopped");

    Ok(())
}
