//! Routegate server binary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use routegate::config::load_config;
use routegate::lifecycle::{spawn_signal_handler, Shutdown};
use routegate::middleware::MiddlewareRegistry;
use routegate::observability::{init_logging, init_metrics};
use routegate::store::InMemoryStore;
use routegate::upstream::ReqwestTransport;
use routegate::{GatewayPipeline, GatewayServer};

#[derive(Parser)]
#[command(name = "routegate", version, about = "Declarative reverse-proxy API gateway")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "routegate.toml")]
    config: PathBuf,

    /// Override `observability.log_level`
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(level) = args.log_level {
        config.observability.log_level = level;
    }

    init_logging(&config.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "routegate starting");
    tracing::info!(
        config = %args.config.display(),
        routes = config.routes.len(),
        bind_address = %config.server.bind_address,
        max_body_size = config.server.max_body_size,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();

    let store = Arc::new(InMemoryStore::new());
    let sweeper = store.spawn_sweeper(
        Duration::from_secs(config.store.sweep_interval_secs.max(1)),
        shutdown.subscribe(),
    );

    let transport = Arc::new(ReqwestTransport::new()?);
    let pipeline = GatewayPipeline::new(
        config.routes,
        store,
        transport,
        &MiddlewareRegistry::with_builtins(),
    )?;

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    spawn_signal_handler(shutdown.clone());
    GatewayServer::new(Arc::new(pipeline), &config.server)
        .run(listener, shutdown)
        .await?;

    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "Store sweeper ended abnormally");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
