//! Configuration loading for the BHP backend
//!
//! Each field resolves in priority order:
//! 1. Command-line argument (bind address only)
//! 2. Environment variable (`BHP_*`)
//! 3. TOML config file
//! 4. Compiled default

use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

/// Default service bind address (the port the original backend listened on)
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:4000";

/// Default PostgreSQL connection string
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/bhproperties";

/// Default ArcGIS REST proxy base URL
pub const DEFAULT_GIS_BASE_URL: &str = "https://www.gis.bh/arcgis/rest/services";

/// Referer header the GIS proxy expects on every request
pub const DEFAULT_GIS_REFERER: &str = "https://www.benayat.bh/";

/// Default valuation model service base URL
pub const DEFAULT_MODEL_URL: &str = "http://127.0.0.1:5001";

/// Per-call timeout for outbound GIS and model requests, in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// External GIS proxy settings
#[derive(Debug, Clone)]
pub struct GisConfig {
    /// ArcGIS REST services base URL
    pub base_url: String,
    /// Referer header value sent with every query
    pub referer: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// HTTP listen address, e.g. "127.0.0.1:4000"
    pub bind_addr: String,
    /// PostgreSQL connection string (PostGIS-enabled database)
    pub database_url: String,
    /// Outbound GIS proxy settings
    pub gis: GisConfig,
    /// Valuation model service base URL
    pub model_url: String,
}

/// Optional fields as they appear in the TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub bind_addr: Option<String>,
    pub database_url: Option<String>,
    pub model_url: Option<String>,
    #[serde(default)]
    pub gis: TomlGisConfig,
}

/// `[gis]` section of the TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlGisConfig {
    pub base_url: Option<String>,
    pub referer: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Load the TOML config file, if one exists at the given path
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        return Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Resolve one string field: ENV -> TOML -> default
fn resolve_field(env_var: &str, toml_value: Option<&str>, default: &str) -> String {
    if let Ok(value) = std::env::var(env_var) {
        if !value.trim().is_empty() {
            return value;
        }
    }
    toml_value
        .map(str::to_string)
        .unwrap_or_else(|| default.to_string())
}

/// Resolve the full service configuration
///
/// `cli_bind` (from the command line) takes priority over everything for
/// the bind address.
pub fn resolve_config(
    config_path: Option<&Path>,
    cli_bind: Option<&str>,
) -> Result<ServiceConfig> {
    let toml = load_toml_config(config_path)?;

    let bind_addr = match cli_bind {
        Some(addr) => addr.to_string(),
        None => resolve_field("BHP_BIND_ADDR", toml.bind_addr.as_deref(), DEFAULT_BIND_ADDR),
    };

    let timeout_secs = match std::env::var("BHP_GIS_TIMEOUT_SECS") {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(
                "BHP_GIS_TIMEOUT_SECS is not a number ({}), using default",
                raw
            );
            toml.gis.timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
        }),
        Err(_) => toml.gis.timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
    };

    Ok(ServiceConfig {
        bind_addr,
        database_url: resolve_field(
            "BHP_DATABASE_URL",
            toml.database_url.as_deref(),
            DEFAULT_DATABASE_URL,
        ),
        gis: GisConfig {
            base_url: resolve_field(
                "BHP_GIS_BASE_URL",
                toml.gis.base_url.as_deref(),
                DEFAULT_GIS_BASE_URL,
            ),
            referer: resolve_field(
                "BHP_GIS_REFERER",
                toml.gis.referer.as_deref(),
                DEFAULT_GIS_REFERER,
            ),
            timeout_secs,
        },
        model_url: resolve_field("BHP_MODEL_URL", toml.model_url.as_deref(), DEFAULT_MODEL_URL),
    })
}
