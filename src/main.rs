//! dispatch-scheduler - daily route-and-schedule optimizer for a
//! dispatching business. Serves the HTTP API described in `/api/v1/schedule`.

mod cli;
mod config;
mod db;
mod errors;
mod http;
mod services;
mod types;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use services::cancellation::ScheduleLockRegistry;
use services::routing::{HttpMatrixProvider, TravelProvider};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    dotenvy::dotenv().ok();

    let config = config::Config::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;

    match cli.command {
        Some(cli::Command::Migrate) => {
            db::run_migrations(&pool).await?;
            info!("Migrations complete, exiting.");
            Ok(())
        }
        Some(cli::Command::Serve) | None => run_server(config, pool).await,
    }
}

async fn run_server(config: config::Config, pool: sqlx::PgPool) -> Result<()> {
    std::fs::create_dir_all(&config.logs_dir).ok();

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.logs_dir, "dispatch-scheduler.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,dispatch_scheduler=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    info!("Starting dispatch-scheduler...");

    db::run_migrations(&pool).await?;
    info!("Database migrations complete");

    let provider: Option<Arc<dyn TravelProvider>> = config
        .google_maps_api_key
        .as_ref()
        .map(|key| Arc::new(HttpMatrixProvider::new(key.clone())) as Arc<dyn TravelProvider>);

    if provider.is_none() {
        info!("GOOGLE_MAPS_API_KEY not set, using haversine travel-time estimates");
    }

    let locks = ScheduleLockRegistry::new(config.solve_concurrency);
    let state = http::AppState { pool, provider, locks };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Listening");
    axum::serve(listener, router).await?;

    Ok(())
}
