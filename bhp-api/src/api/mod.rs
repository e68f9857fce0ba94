//! HTTP API handlers for bhp-api

pub mod health;
pub mod parcels;
pub mod predict;

pub use health::health_routes;
pub use parcels::parcel_routes;
pub use predict::predict_routes;
