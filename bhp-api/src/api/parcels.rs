//! Parcel API handlers
//!
//! GET /coordinates, GET /parcels/:parcel_no, POST /parcels/:parcel_no/ensure

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;

use crate::db::properties;
use crate::error::{ApiError, ApiResult};
use crate::models::EnrichmentOutcome;
use crate::AppState;

/// POST /parcels/:parcel_no/ensure response
#[derive(Debug, Serialize)]
pub struct EnsureParcelResponse {
    pub success: bool,
    pub outcome: EnrichmentOutcome,
    pub message: String,
}

/// Validate a parcel number path segment: non-empty alphanumeric token
fn validate_parcel_no(parcel_no: &str) -> ApiResult<()> {
    let trimmed = parcel_no.trim();
    if trimmed.is_empty() || trimmed.len() > 16 {
        return Err(ApiError::BadRequest(format!(
            "Invalid parcel number: {:?}",
            parcel_no
        )));
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ApiError::BadRequest(format!(
            "Parcel number must be alphanumeric: {:?}",
            parcel_no
        )));
    }
    Ok(())
}

/// POST /parcels/:parcel_no/ensure
///
/// Triggers the enrichment pipeline. Success means the parcel either has a
/// row in the properties table or was confirmed nonexistent.
pub async fn ensure_parcel(
    State(state): State<AppState>,
    Path(parcel_no): Path<String>,
) -> ApiResult<Json<EnsureParcelResponse>> {
    validate_parcel_no(&parcel_no)?;
    let parcel_no = parcel_no.trim();

    match state.enricher.ensure_recorded(parcel_no).await {
        Ok(outcome) => Ok(Json(EnsureParcelResponse {
            success: true,
            outcome,
            message: outcome.message().to_string(),
        })),
        Err(err) => {
            tracing::error!(parcel_no = %parcel_no, error = %err, "Enrichment failed");
            state.record_error(err.to_string()).await;
            Err(ApiError::Internal(format!(
                "Failed to record parcel {}: {}",
                parcel_no, err
            )))
        }
    }
}

/// GET /parcels/:parcel_no
///
/// The persisted attribute row for one parcel; 404 when absent.
pub async fn get_parcel(
    State(state): State<AppState>,
    Path(parcel_no): Path<String>,
) -> ApiResult<Json<properties::PropertyRow>> {
    validate_parcel_no(&parcel_no)?;

    let row = properties::fetch_parcel(&state.db, parcel_no.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Parcel not found: {}", parcel_no)))?;

    Ok(Json(row))
}

/// GET /coordinates
///
/// All recorded parcels as a GeoJSON FeatureCollection in WGS84.
pub async fn coordinates(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let parcels = properties::fetch_coordinates(&state.db).await?;

    let features: Vec<serde_json::Value> = parcels
        .into_iter()
        .map(|parcel| {
            json!({
                "type": "Feature",
                "geometry": parcel.geojson,
                "properties": { "parcel_no": parcel.parcel_no },
            })
        })
        .collect();

    Ok(Json(json!({
        "type": "FeatureCollection",
        "features": features,
    })))
}

/// Build parcel routes
pub fn parcel_routes() -> Router<AppState> {
    Router::new()
        .route("/coordinates", get(coordinates))
        .route("/parcels/:parcel_no", get(get_parcel))
        .route("/parcels/:parcel_no/ensure", post(ensure_parcel))
}
