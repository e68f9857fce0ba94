//! Administrative boundary identify client (stage B)
//!
//! Tolerance-bounded identify query against the admin boundary map service,
//! using the resolved parcel polygon. Supplies the block number, area names
//! in both locales, governorate, and ministerial reference.

use bhp_common::geometry::{Geometry, BAHRAIN_GRID_WKID};

use super::gis_client::{extract_fields, GisClient, Lookup};
use crate::models::AttributeMap;

const BOUNDARY_SERVICE: &str = "/AdminBoundary/MapServer/identify";

/// Identify pixel tolerance
const IDENTIFY_TOLERANCE: u32 = 1;

/// Nominal display used to scale the identify tolerance
const IDENTIFY_DISPLAY: &str = "400,400,96";

/// Administrative fields taken from the boundary service
const BOUNDARY_FIELDS: &[(&str, &str)] = &[
    ("BLOCK_NO", "block_no"),
    ("AREA_NAME_EN", "area_name_en"),
    ("AREA_NAME_AR", "area_name_ar"),
    ("GOVERNORATE", "governorate"),
    ("MIN_REF", "min_ref"),
];

/// Admin boundary identify client
#[derive(Debug, Clone)]
pub struct BoundaryClient {
    gis: GisClient,
}

impl BoundaryClient {
    pub fn new(gis: GisClient) -> Self {
        Self { gis }
    }

    /// Identify the administrative boundary containing the parcel (stage B)
    pub async fn fetch_attributes(&self, geometry: &Geometry) -> Lookup<AttributeMap> {
        let Some((xmin, ymin, xmax, ymax)) = geometry.extent() else {
            return Lookup::Miss;
        };

        let params = [
            ("geometry", geometry.to_esri_json()),
            ("geometryType", "esriGeometryPolygon".to_string()),
            ("sr", BAHRAIN_GRID_WKID.to_string()),
            ("tolerance", IDENTIFY_TOLERANCE.to_string()),
            ("mapExtent", format!("{},{},{},{}", xmin, ymin, xmax, ymax)),
            ("imageDisplay", IDENTIFY_DISPLAY.to_string()),
            ("layers", "all".to_string()),
            ("returnGeometry", "false".to_string()),
        ];

        match self.gis.identify(BOUNDARY_SERVICE, &params).await {
            Ok(results) => match results.first() {
                Some(result) => Lookup::Hit(extract_fields(&result.attributes, BOUNDARY_FIELDS)),
                None => Lookup::Miss,
            },
            Err(err) => {
                tracing::warn!(error = %err, "Boundary identify failed");
                Lookup::Failed(err)
            }
        }
    }
}
