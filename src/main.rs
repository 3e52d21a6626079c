use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tracing::info;

mod api;
mod config;
mod db;
mod error;
mod staking;

use api::AppState;
use config::Config;
use db::Database;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    let parlay = config.parlay_options();
    info!(
        days_projection = config.days_projection,
        max_legs = parlay.max_legs,
        min_leg_ev = parlay.min_leg_ev,
        stake_cap = parlay.stake_cap,
        "Staking defaults loaded"
    );

    let state = AppState {
        db,
        days_projection: config.days_projection,
        max_days_projection: config.max_days_projection,
        parlay,
    };
    let app = api::router(state);
    let addr: SocketAddr = config.listen_addr.parse()?;
    info!("Recommendation API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
