//! bhp-api library interface
//!
//! Exposes the application state, router, and service modules for
//! integration testing.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use bhp_common::config::ServiceConfig;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db::properties::PgPropertyStore;
use crate::services::{EnrichmentService, GisServices};

/// Concrete orchestrator type used by the HTTP handlers
pub type Enricher = EnrichmentService<PgPropertyStore, GisServices>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,
    /// Parcel enrichment orchestrator
    pub enricher: Arc<Enricher>,
    /// HTTP client for the valuation model proxy
    pub http: reqwest::Client,
    /// Resolved service configuration
    pub config: Arc<ServiceConfig>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        enricher: Enricher,
        http: reqwest::Client,
        config: ServiceConfig,
    ) -> Self {
        Self {
            db,
            enricher: Arc::new(enricher),
            http,
            config: Arc::new(config),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Record the most recent handler error for the health endpoint
    pub async fn record_error(&self, message: String) {
        *self.last_error.write().await = Some(message);
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::parcel_routes())
        .merge(api::predict_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
