//! Valuation proxy endpoint
//!
//! POST /predict forwards the request body to the external model service
//! and relays its response. The model itself (feature alignment, algorithm)
//! lives entirely in that service.

use axum::{extract::State, routing::post, Json, Router};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /predict
pub async fn predict(
    State(state): State<AppState>,
    Json(input): Json<Value>,
) -> ApiResult<Json<Value>> {
    let url = format!("{}/predict", state.config.model_url.trim_end_matches('/'));

    tracing::debug!(url = %url, "Forwarding prediction request");

    let response = state
        .http
        .post(&url)
        .json(&input)
        .send()
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "Model service unreachable");
            ApiError::Upstream(format!("Model service unreachable: {}", err))
        })?;

    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|err| ApiError::Upstream(format!("Invalid model service response: {}", err)))?;

    if !status.is_success() {
        state
            .record_error(format!("Model service returned {}", status))
            .await;
        return Err(ApiError::Upstream(format!(
            "Model service returned {}",
            status
        )));
    }

    Ok(Json(body))
}

/// Build prediction routes
pub fn predict_routes() -> Router<AppState> {
    Router::new().route("/predict", post(predict))
}
