//! Service layer for bhp-api
//!
//! One client per external GIS lookup, the pure record merger, and the
//! enrichment orchestrator that ties them to the store.

pub mod boundary_client;
pub mod cadastral_client;
pub mod enrichment;
pub mod gis_client;
pub mod record_merger;
pub mod utility_client;
pub mod zoning_client;

pub use boundary_client::BoundaryClient;
pub use cadastral_client::CadastralClient;
pub use enrichment::{EnrichmentService, GisGateway, PropertyStore};
pub use gis_client::{GisClient, GisError, Lookup};
pub use record_merger::merge_stages;
pub use utility_client::UtilityClient;
pub use zoning_client::ZoningClient;

use async_trait::async_trait;
use bhp_common::config::GisConfig;
use bhp_common::geometry::Geometry;

use crate::models::AttributeMap;

/// The live GIS gateway: one shared HTTP client behind the four stage
/// clients and the geometry resolver.
#[derive(Debug, Clone)]
pub struct GisServices {
    cadastral: CadastralClient,
    utility: UtilityClient,
    boundary: BoundaryClient,
    zoning: ZoningClient,
}

impl GisServices {
    pub fn new(config: &GisConfig) -> Result<Self, GisError> {
        let gis = GisClient::new(config)?;
        Ok(Self {
            cadastral: CadastralClient::new(gis.clone()),
            utility: UtilityClient::new(gis.clone()),
            boundary: BoundaryClient::new(gis.clone()),
            zoning: ZoningClient::new(gis),
        })
    }
}

#[async_trait]
impl GisGateway for GisServices {
    async fn resolve_geometry(&self, parcel_no: &str) -> Lookup<Geometry> {
        self.cadastral.resolve_geometry(parcel_no).await
    }

    async fn utility_attributes(
        &self,
        parcel_no: &str,
        geometry: &Geometry,
    ) -> Lookup<AttributeMap> {
        self.utility.fetch_attributes(parcel_no, geometry).await
    }

    async fn boundary_attributes(&self, geometry: &Geometry) -> Lookup<AttributeMap> {
        self.boundary.fetch_attributes(geometry).await
    }

    async fn zoning_attributes(&self, geometry: &Geometry) -> Lookup<AttributeMap> {
        self.zoning.fetch_attributes(geometry).await
    }

    async fn shape_metrics(&self, parcel_no: &str) -> Lookup<AttributeMap> {
        self.cadastral.fetch_shape_metrics(parcel_no).await
    }
}
