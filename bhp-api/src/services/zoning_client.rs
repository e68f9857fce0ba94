//! Zoning fence layer client (stage C)
//!
//! Polygon-intersects query against the national zoning plan fence layer.
//! Supplies the zoning code, its descriptions in both locales, and the
//! zoning effective date, normalized to an integer year when parseable.

use bhp_common::geometry::Geometry;
use serde_json::Value;

use super::gis_client::{extract_fields, polygon_query_params, GisClient, Lookup};
use crate::models::AttributeMap;

const ZONING_LAYER: &str = "/ZoningFence/MapServer/0/query";

/// Zoning fields taken from the fence layer (nzp_date handled separately)
const ZONING_FIELDS: &[(&str, &str)] = &[
    ("OBJECTID", "objectid"),
    ("NZP_CODE", "nzp_code"),
    ("NZP_DESC_EN", "nzp_desc_en"),
    ("NZP_DESC_AR", "nzp_desc_ar"),
];

/// Zoning fence layer client
#[derive(Debug, Clone)]
pub struct ZoningClient {
    gis: GisClient,
}

impl ZoningClient {
    pub fn new(gis: GisClient) -> Self {
        Self { gis }
    }

    /// Fetch zoning attributes for the parcel polygon (stage C)
    pub async fn fetch_attributes(&self, geometry: &Geometry) -> Lookup<AttributeMap> {
        let params = polygon_query_params(geometry);

        match self.gis.query(ZONING_LAYER, &params).await {
            Ok(features) => match features.first() {
                Some(feature) => {
                    let mut fields = extract_fields(&feature.attributes, ZONING_FIELDS);
                    if let Some(raw) = feature.attributes.get("NZP_DATE") {
                        fields.insert("nzp_date".to_string(), normalize_nzp_date(raw));
                    }
                    Lookup::Hit(fields)
                }
                None => Lookup::Miss,
            },
            Err(err) => {
                tracing::warn!(error = %err, "Zoning fetch failed");
                Lookup::Failed(err)
            }
        }
    }
}

/// Normalize the zoning effective date to an integer, or null when the
/// layer supplies something unparseable.
fn normalize_nzp_date(raw: &Value) -> Value {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(Value::from)
            .unwrap_or(Value::Null),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}
