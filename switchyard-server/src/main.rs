//! Switchyard Server - Headless Gateway Daemon
//!
//! Puts one HTTP surface in front of several LLM providers:
//! - `POST /v1/completions` runs the full pipeline (keys, limits, cache, ledger)
//! - `/usage`, `/cache`, `/rate-limits`, `/auth/keys` expose the admin operations
//! - `/health` and `/metrics` for health checks and Prometheus

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod api;
mod cli;
mod commands;
mod router;
mod state;

use cli::{Cli, Commands};
use state::AppState;
use switchyard_core::Gateway;
use switchyard_types::GatewayConfig;

/// Idle full buckets are dropped this often.
const LIMITER_PRUNE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = switchyard_core::config::load_config(Some(&cli.config))?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::GenerateKey { owner, admin, models, rate_limit } => {
            commands::generate_key(&config, &owner, admin, models, rate_limit)
        },
        Commands::CheckConfig => commands::check_config(&config, &cli.config),
    }
}

async fn serve(config: GatewayConfig) -> Result<()> {
    let _log_guard = switchyard_core::logging::init_logging(&config.logging)?;
    switchyard_core::metrics::init_metrics()?;

    info!("Switchyard v{} starting", env!("CARGO_PKG_VERSION"));

    let gateway = Arc::new(Gateway::from_config(&config)?);
    info!("Gateway initialized ({} API keys loaded)", gateway.registry().len());

    let sweeper = (config.cache.sweep_interval_secs > 0).then(|| {
        Arc::clone(gateway.cache()).spawn_sweeper(Duration::from_secs(config.cache.sweep_interval_secs))
    });

    let limiter = Arc::clone(gateway.limiter());
    let pruner = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(LIMITER_PRUNE_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = limiter.prune_idle();
            if removed > 0 {
                tracing::debug!("Pruned {} idle rate limit buckets", removed);
            }
        }
    });

    let state = AppState::from_config(gateway, &config);
    let app = router::build_router(state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    pruner.abort();
    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
