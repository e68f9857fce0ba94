//! HTTP API tests
//!
//! Router-level tests that never touch the database or the network: the
//! pool is lazy and only handlers with validation/404 paths are exercised.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use bhp_api::db::properties::PgPropertyStore;
use bhp_api::services::{EnrichmentService, GisServices};
use bhp_api::AppState;
use bhp_common::config::{resolve_config, ServiceConfig};

fn test_state() -> AppState {
    let config: ServiceConfig = resolve_config(None, None).unwrap();

    // Lazy pool: no connection is attempted until a query runs
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .unwrap();

    let gis = GisServices::new(&config.gis).unwrap();
    let enricher = EnrichmentService::new(PgPropertyStore::new(pool.clone()), gis);
    let http = reqwest::Client::new();

    AppState::new(pool, enricher, http, config)
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = bhp_api::build_router(test_state());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "bhp-api");
    assert!(json["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_invalid_parcel_number_is_rejected_before_any_lookup() {
    let app = bhp_api::build_router(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/parcels/12%27%3B%20DROP/ensure")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = bhp_api::build_router(test_state());

    let response = app
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
