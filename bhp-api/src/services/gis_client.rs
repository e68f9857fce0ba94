//! Shared ArcGIS REST client plumbing
//!
//! All four attribute stages and the geometry resolver go through the same
//! third-party proxy. This module owns the HTTP client (fixed referer
//! header, bounded timeout, no retry), the query/identify request shapes,
//! and the `Lookup` outcome type that keeps absence distinct from failure.

use bhp_common::config::GisConfig;
use bhp_common::geometry::{Geometry, BAHRAIN_GRID_WKID};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = "BHP/0.1.0 (property backend)";

/// GIS proxy client errors
#[derive(Debug, Error)]
pub enum GisError {
    /// Network communication error (includes timeouts)
    #[error("Network error: {0}")]
    Network(String),

    /// Proxy returned a non-success status
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Failed to parse the response JSON
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Outcome of one external lookup.
///
/// `Miss` (the service answered with zero features) and `Failed` (transport
/// or parse error) are deliberately distinct: both degrade to absence at
/// the orchestrator, but only `Failed` carries a cause worth logging.
#[derive(Debug)]
pub enum Lookup<T> {
    /// Service answered with a matching feature
    Hit(T),
    /// Service answered, but nothing matched
    Miss,
    /// Transport or parse failure
    Failed(GisError),
}

impl<T> Lookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    /// Absorb failure into absence, logging the cause against the stage name
    pub fn absorb(self, stage: &str) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss => {
                tracing::debug!(stage = %stage, "No matching features");
                None
            }
            Lookup::Failed(err) => {
                tracing::warn!(stage = %stage, error = %err, "Lookup failed, treating as absent");
                None
            }
        }
    }
}

/// One feature from a query or identify response
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    /// Raw attribute map as returned by the layer
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// Feature geometry, when the query asked for it
    pub geometry: Option<EsriGeometry>,
}

/// Esri JSON polygon geometry
#[derive(Debug, Clone, Deserialize)]
pub struct EsriGeometry {
    #[serde(default)]
    pub rings: Vec<Vec<(f64, f64)>>,
}

impl EsriGeometry {
    pub fn into_geometry(self) -> Geometry {
        Geometry::new(self.rings)
    }
}

/// Layer query response: `{"features": [...]}`
#[derive(Debug, Deserialize)]
struct FeatureSet {
    #[serde(default)]
    features: Vec<Feature>,
}

/// Identify response: `{"results": [...]}`
#[derive(Debug, Deserialize)]
struct IdentifySet {
    #[serde(default)]
    results: Vec<Feature>,
}

/// HTTP client for the ArcGIS REST proxy
#[derive(Debug, Clone)]
pub struct GisClient {
    http: reqwest::Client,
    base_url: String,
}

impl GisClient {
    /// Create a client with the proxy's fixed header set and timeout
    pub fn new(config: &GisConfig) -> Result<Self, GisError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let referer = reqwest::header::HeaderValue::from_str(&config.referer)
            .map_err(|e| GisError::Network(format!("Invalid referer header: {}", e)))?;
        headers.insert(reqwest::header::REFERER, referer);

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GisError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Issue a layer query; returns the raw feature list
    pub async fn query(
        &self,
        layer_path: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<Feature>, GisError> {
        let set: FeatureSet = self.get_json(layer_path, params).await?;
        Ok(set.features)
    }

    /// Issue an identify request against a map service
    pub async fn identify(
        &self,
        service_path: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<Feature>, GisError> {
        let set: IdentifySet = self.get_json(service_path, params).await?;
        Ok(set.results)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, GisError> {
        let url = format!("{}{}", self.base_url, path);

        tracing::debug!(url = %url, "Querying GIS proxy");

        let response = self
            .http
            .get(&url)
            .query(&[("f", "json")])
            .query(params)
            .send()
            .await
            .map_err(|e| GisError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GisError::Api(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| GisError::Parse(e.to_string()))
    }
}

/// Build a `where` clause matching one parcel number exactly.
///
/// Parcel numbers are alphanumeric tokens; everything else is stripped
/// before the value is embedded in the clause.
pub fn parcel_where(parcel_no: &str) -> String {
    let sanitized: String = parcel_no
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    format!("PARCEL_NO = '{}'", sanitized)
}

/// Common parameters for a polygon-intersects layer query
pub fn polygon_query_params(geometry: &Geometry) -> Vec<(&'static str, String)> {
    vec![
        ("geometry", geometry.to_esri_json()),
        ("geometryType", "esriGeometryPolygon".to_string()),
        ("spatialRel", "esriSpatialRelIntersects".to_string()),
        ("inSR", BAHRAIN_GRID_WKID.to_string()),
        ("outSR", BAHRAIN_GRID_WKID.to_string()),
        ("outFields", "*".to_string()),
    ]
}

/// Copy a fixed set of fields out of a feature's raw attributes, renaming
/// `(source, record)` pairs to the record's field names. Null and missing
/// source fields are omitted rather than zero-filled.
pub fn extract_fields(
    attrs: &Map<String, Value>,
    fields: &[(&str, &str)],
) -> Map<String, Value> {
    let mut out = Map::new();
    for (src, dst) in fields {
        if let Some(value) = attrs.get(*src) {
            if !value.is_null() {
                out.insert(dst.to_string(), value.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parcel_where_strips_injection_characters() {
        assert_eq!(parcel_where("12345"), "PARCEL_NO = '12345'");
        assert_eq!(parcel_where("12' OR 1=1--"), "PARCEL_NO = '12OR11'");
    }

    #[test]
    fn test_lookup_absorb() {
        assert_eq!(Lookup::Hit(5).absorb("a"), Some(5));
        assert_eq!(Lookup::<i32>::Miss.absorb("a"), None);
        assert_eq!(
            Lookup::<i32>::Failed(GisError::Network("timeout".into())).absorb("a"),
            None
        );
    }

    #[test]
    fn test_feature_set_parsing() {
        let body = r#"{
            "features": [
                {
                    "attributes": {"PARCEL_NO": "12345", "SHAPE_AREA": 999.99},
                    "geometry": {"rings": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]}
                }
            ]
        }"#;
        let set: FeatureSet = serde_json::from_str(body).unwrap();
        assert_eq!(set.features.len(), 1);

        let feature = &set.features[0];
        assert_eq!(feature.attributes["PARCEL_NO"], "12345");
        let geom = feature.geometry.clone().unwrap().into_geometry();
        assert_eq!(geom.rings[0][1], (1.0, 0.0));
    }

    #[test]
    fn test_empty_feature_set_parsing() {
        let set: FeatureSet = serde_json::from_str("{}").unwrap();
        assert!(set.features.is_empty());

        let idents: IdentifySet = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert!(idents.results.is_empty());
    }

    #[test]
    fn test_extract_fields_renames_and_skips_nulls() {
        let attrs: Map<String, Value> = serde_json::from_str(
            r#"{"EWA_EDD": "X", "SEWER": null, "ROADS": 2}"#,
        )
        .unwrap();

        let out = extract_fields(
            &attrs,
            &[
                ("EWA_EDD", "ewa_edd"),
                ("SEWER", "sewer"),
                ("ROADS", "roads"),
                ("GATED_COMMUNITY", "gated_community"),
            ],
        );

        assert_eq!(out["ewa_edd"], "X");
        assert_eq!(out["roads"], 2);
        assert!(!out.contains_key("sewer"));
        assert!(!out.contains_key("gated_community"));
    }

    #[test]
    fn test_polygon_query_params_use_structured_geometry() {
        let geom = Geometry::new(vec![vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]]);
        let params = polygon_query_params(&geom);

        let geometry_param = &params.iter().find(|(k, _)| *k == "geometry").unwrap().1;
        let parsed: serde_json::Value = serde_json::from_str(geometry_param).unwrap();
        assert_eq!(parsed["spatialReference"]["wkid"], 20439);
    }
}
