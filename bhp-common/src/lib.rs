//! # BHP Common Library
//!
//! Shared code for the BHP property backend:
//! - Error types
//! - Configuration loading
//! - Parcel geometry model (rings, Esri JSON, WKT)

pub mod config;
pub mod error;
pub mod geometry;

pub use error::{Error, Result};
pub use geometry::{Geometry, BAHRAIN_GRID_WKID};
