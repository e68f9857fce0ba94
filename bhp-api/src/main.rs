//! bhp-api - Property Backend Service
//!
//! HTTP backend for the property valuation system: serves recorded parcel
//! data, proxies valuation requests to the model service, and runs the
//! cadastral enrichment pipeline on demand.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bhp_api::db::properties::PgPropertyStore;
use bhp_api::services::{EnrichmentService, GisServices};
use bhp_api::AppState;

#[derive(Debug, Parser)]
#[command(name = "bhp-api", about = "Property backend service")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, env = "BHP_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address override, e.g. 127.0.0.1:4000
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting bhp-api (Property Backend)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = bhp_common::config::resolve_config(cli.config.as_deref(), cli.bind.as_deref())
        .context("Failed to resolve configuration")?;

    // Database pool + schema init
    let db_pool = bhp_api::db::init_database_pool(&config.database_url)
        .await
        .context("Failed to initialize database")?;
    info!("Database connection established");

    // External GIS gateway (shared HTTP client, fixed referer, bounded timeout)
    let gis = GisServices::new(&config.gis)
        .map_err(|e| anyhow::anyhow!("Failed to initialize GIS client: {}", e))?;
    info!(base_url = %config.gis.base_url, "GIS gateway initialized");

    let enricher = EnrichmentService::new(PgPropertyStore::new(db_pool.clone()), gis);

    // Client for the valuation model proxy
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.gis.timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(db_pool, enricher, http, config);
    let app = bhp_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
