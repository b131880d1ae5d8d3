use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod config;
mod dashboard;
mod engine;
mod error;
mod players;
mod schedule;

use config::Config;
use dashboard::AppState;
use players::PlayerSource;
use schedule::{start_schedule_refresher, GameStore, NhlWebApi, ScheduleSource};

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

    match &config.season {
        Some(season) => info!("Following {} for season {}", config.team, season),
        None => info!("Following {} for the current season", config.team),
    }

    // One client serves both schedules and player landings.
    let nhl = Arc::new(
        NhlWebApi::new(
            &config.nhl_api_url,
            Duration::from_secs(config.http_timeout_secs),
        )
        .context("Failed to build NHL API client")?,
    );
    let source: Arc<dyn ScheduleSource> = nhl.clone();
    let players: Arc<dyn PlayerSource> = nhl;
    info!("Schedule source: {} ({})", source.name(), config.nhl_api_url);

    // Background schedule loading; the dashboard serves whatever has arrived.
    let store = GameStore::new();
    start_schedule_refresher(
        source,
        store.clone(),
        config.team.clone(),
        config.season.clone(),
        config.batch_size,
        Duration::from_secs(config.refresh_interval_secs),
    );

    let app = dashboard::router(AppState {
        store,
        players,
        team: config.team.clone(),
        featured_player: config.featured_player,
    });
    let addr: SocketAddr = config.dashboard_addr.parse()?;
    info!("Dashboard listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run dashboard server (blocks until shutdown)
    axum::serve(listener, app).await?;

    Ok(())
}
