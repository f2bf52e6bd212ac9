use anyhow::{Context, Result};
use tracing::{error, info};

use splat_gateway::logging::init_tracing;
use splat_gateway::server::{AppState, GatewayServer};
use splat_gateway::GatewayConfig;

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        error!("gateway failed to start: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = GatewayConfig::from_env().context("loading configuration")?;
    info!("using frontend dist at {}", config.frontend_dist.display());
    info!("using storage root at {}", config.storage_root.display());
    info!(
        "converter: {} {}",
        config.converter.program,
        config.converter.args.join(" ")
    );

    let state = AppState::from_config(config)?;
    let server = GatewayServer::start(state)
        .await
        .context("starting http server")?;

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutdown requested");
    server.shutdown().await;
    Ok(())
}
