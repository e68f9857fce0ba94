//! Utility fence layer client (stage A)
//!
//! Polygon-intersects query against the utility/fence layer. The layer can
//! return several candidate features for one polygon (fences overlap at
//! parcel edges), so candidates are cross-checked against the parcel-number
//! attribute and the first exact match wins.

use bhp_common::geometry::Geometry;
use serde_json::Value;

use super::gis_client::{extract_fields, polygon_query_params, Feature, GisClient, Lookup};
use crate::models::AttributeMap;

const FENCE_LAYER: &str = "/FenceQuery/MapServer/0/query";

/// Utility and access fields taken from the fence layer
const UTILITY_FIELDS: &[(&str, &str)] = &[
    ("EWA_EDD", "ewa_edd"),
    ("EWA_WDD", "ewa_wdd"),
    ("ROADS", "roads"),
    ("SEWER", "sewer"),
    ("GATED_COMMUNITY", "gated_community"),
];

/// Utility fence layer client
#[derive(Debug, Clone)]
pub struct UtilityClient {
    gis: GisClient,
}

impl UtilityClient {
    pub fn new(gis: GisClient) -> Self {
        Self { gis }
    }

    /// Fetch utility attributes for the parcel (stage A)
    pub async fn fetch_attributes(
        &self,
        parcel_no: &str,
        geometry: &Geometry,
    ) -> Lookup<AttributeMap> {
        let params = polygon_query_params(geometry);

        match self.gis.query(FENCE_LAYER, &params).await {
            Ok(features) => match pick_parcel_feature(&features, parcel_no) {
                Some(feature) => Lookup::Hit(extract_fields(&feature.attributes, UTILITY_FIELDS)),
                None => Lookup::Miss,
            },
            Err(err) => {
                tracing::warn!(parcel_no = %parcel_no, error = %err, "Utility fetch failed");
                Lookup::Failed(err)
            }
        }
    }
}

/// Select the first candidate whose parcel-number attribute matches exactly.
///
/// The attribute arrives as either a string or a number depending on the
/// layer version, so both are compared in string form.
fn pick_parcel_feature<'a>(features: &'a [Feature], parcel_no: &str) -> Option<&'a Feature> {
    features.iter().find(|f| {
        match f.attributes.get("PARCEL_NO") {
            Some(Value::String(s)) => s == parcel_no,
            Some(Value::Number(n)) => n.to_string() == parcel_no,
            _ => false,
        }
    })
}
