use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use edge_proxy::config::Config;
use edge_proxy::observability::init_tracing;
use edge_proxy::{EdgeProxy, ProcessEnvironment};

#[derive(Parser, Debug)]
#[command(name = "edge-proxy")]
#[command(about = "Edge reverse proxy with an origin-aware CORS policy")]
struct Args {
    /// YAML configuration file; built-in defaults are used when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Override server.host
    #[arg(long)]
    host: Option<String>,

    /// Override server.port
    #[arg(short, long)]
    port: Option<u16>,

    /// Validate the configuration, print the effective settings and exit
    #[arg(short, long)]
    validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path).await?,
        None => Config::default(),
    };

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    init_tracing(&config.logging);

    if args.validate_config {
        print!("{}", config.to_yaml()?);
        info!("Configuration is valid");
        return Ok(());
    }

    let server_config = config.server.clone();
    let proxy = Arc::new(EdgeProxy::new(config, Arc::new(ProcessEnvironment))?);
    info!("Default backend origin: {}", proxy.config().proxy.default_backend_origin);

    proxy.start(&server_config, shutdown_signal()).await?;

    info!("Edge proxy shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received shutdown signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
