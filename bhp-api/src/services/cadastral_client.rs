//! Cadastral feature service client
//!
//! Anchors the whole pipeline: resolves a parcel number to its polygon
//! geometry, and (re-queried separately) supplies the surveyed shape
//! metrics. Both lookups match on the parcel number exactly; zero features
//! means the parcel number does not exist in the cadastre.

use bhp_common::geometry::{Geometry, BAHRAIN_GRID_WKID};

use super::gis_client::{extract_fields, parcel_where, GisClient, Lookup};
use crate::models::AttributeMap;

const CADASTRE_LAYER: &str = "/CadastreQuery/MapServer/0/query";

/// Shape metric fields taken from the cadastral layer
const SHAPE_FIELDS: &[(&str, &str)] = &[
    ("SHAPE_AREA", "shape_area"),
    ("SHAPE_LEN", "shape_len"),
];

/// Cadastral query client (geometry resolver + shape metrics)
#[derive(Debug, Clone)]
pub struct CadastralClient {
    gis: GisClient,
}

impl CadastralClient {
    pub fn new(gis: GisClient) -> Self {
        Self { gis }
    }

    /// Resolve a parcel number to its polygon geometry.
    ///
    /// Never raises to the caller: transport and parse failures are logged
    /// here and returned as `Failed`, which downstream treats like a miss.
    pub async fn resolve_geometry(&self, parcel_no: &str) -> Lookup<Geometry> {
        let params = [
            ("where", parcel_where(parcel_no)),
            ("outFields", "PARCEL_NO".to_string()),
            ("returnGeometry", "true".to_string()),
            ("outSR", BAHRAIN_GRID_WKID.to_string()),
        ];

        match self.gis.query(CADASTRE_LAYER, &params).await {
            Ok(features) => {
                let geometry = features
                    .into_iter()
                    .find_map(|f| f.geometry)
                    .map(|g| g.into_geometry())
                    .filter(|g| !g.is_empty());

                match geometry {
                    Some(geometry) => {
                        tracing::debug!(
                            parcel_no = %parcel_no,
                            rings = geometry.rings.len(),
                            "Resolved parcel geometry"
                        );
                        Lookup::Hit(geometry)
                    }
                    None => Lookup::Miss,
                }
            }
            Err(err) => {
                tracing::warn!(parcel_no = %parcel_no, error = %err, "Geometry resolution failed");
                Lookup::Failed(err)
            }
        }
    }

    /// Fetch surveyed shape area and perimeter length (stage D)
    pub async fn fetch_shape_metrics(&self, parcel_no: &str) -> Lookup<AttributeMap> {
        let params = [
            ("where", parcel_where(parcel_no)),
            ("outFields", "SHAPE_AREA,SHAPE_LEN".to_string()),
            ("returnGeometry", "false".to_string()),
        ];

        match self.gis.query(CADASTRE_LAYER, &params).await {
            Ok(features) => match features.first() {
                Some(feature) => Lookup::Hit(extract_fields(&feature.attributes, SHAPE_FIELDS)),
                None => Lookup::Miss,
            },
            Err(err) => {
                tracing::warn!(parcel_no = %parcel_no, error = %err, "Shape metrics fetch failed");
                Lookup::Failed(err)
            }
        }
    }
}
