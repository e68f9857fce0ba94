//! Parcel enrichment orchestrator
//!
//! Sequences the pipeline for one parcel:
//! existence gate -> geometry resolution -> four attribute fetches ->
//! merge -> transactional persist, with the invalid-marking fallback when
//! the cadastre cannot locate the parcel.
//!
//! Everything below the persistence write degrades to absence; only the
//! write itself propagates failure to the caller.

use async_trait::async_trait;
use bhp_common::geometry::Geometry;
use bhp_common::Result;

use super::gis_client::Lookup;
use super::record_merger::merge_stages;
use crate::models::{AttributeMap, EnrichmentOutcome, PropertyRecord};

/// Relational store seam for the enrichment pipeline
#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Point lookup against the primary table's parcel-number key
    async fn exists(&self, parcel_no: &str) -> Result<bool>;

    /// Idempotent upsert recording that the parcel could not be resolved
    async fn mark_invalid(&self, parcel_no: &str) -> Result<()>;

    /// Transactional insert of the merged record plus present-status upsert
    async fn insert(&self, record: &PropertyRecord) -> Result<()>;
}

/// External geospatial service seam
#[async_trait]
pub trait GisGateway: Send + Sync {
    async fn resolve_geometry(&self, parcel_no: &str) -> Lookup<Geometry>;
    async fn utility_attributes(
        &self,
        parcel_no: &str,
        geometry: &Geometry,
    ) -> Lookup<AttributeMap>;
    async fn boundary_attributes(&self, geometry: &Geometry) -> Lookup<AttributeMap>;
    async fn zoning_attributes(&self, geometry: &Geometry) -> Lookup<AttributeMap>;
    async fn shape_metrics(&self, parcel_no: &str) -> Lookup<AttributeMap>;
}

/// Enrichment orchestrator
///
/// Holds the store and gateway as explicit context rather than module
/// state, so tests can substitute doubles for either side.
pub struct EnrichmentService<S, G> {
    store: S,
    gis: G,
}

impl<S: PropertyStore, G: GisGateway> EnrichmentService<S, G> {
    pub fn new(store: S, gis: G) -> Self {
        Self { store, gis }
    }

    /// Ensure the parcel is recorded in the store.
    ///
    /// After a successful return the parcel either has a row in the
    /// primary table or is confirmed nonexistent in the status table.
    /// A parcel already recorded short-circuits before any outbound call;
    /// a row that later turns invalid upstream is never revisited, since
    /// this gate runs first.
    pub async fn ensure_recorded(&self, parcel_no: &str) -> Result<EnrichmentOutcome> {
        // Existence gate, fail-open: a store error only costs a re-fetch
        match self.store.exists(parcel_no).await {
            Ok(true) => {
                tracing::info!(parcel_no = %parcel_no, "Parcel already recorded, skipping fetch");
                return Ok(EnrichmentOutcome::AlreadyRecorded);
            }
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(
                    parcel_no = %parcel_no,
                    error = %err,
                    "Existence check failed, proceeding as if absent"
                );
            }
        }

        let geometry = match self.gis.resolve_geometry(parcel_no).await {
            Lookup::Hit(geometry) => geometry,
            // Resolution failure and a genuine miss take the same path:
            // the parcel is confirmed nonexistent for this operation
            Lookup::Miss | Lookup::Failed(_) => {
                if let Err(err) = self.store.mark_invalid(parcel_no).await {
                    tracing::warn!(
                        parcel_no = %parcel_no,
                        error = %err,
                        "Failed to mark parcel invalid"
                    );
                }
                tracing::info!(parcel_no = %parcel_no, "Parcel not found in cadastre");
                return Ok(EnrichmentOutcome::Invalid);
            }
        };

        // The four stages are independent; fetch concurrently but merge
        // in fixed stage order regardless of completion order
        let (utility, boundary, zoning, shape) = tokio::join!(
            self.gis.utility_attributes(parcel_no, &geometry),
            self.gis.boundary_attributes(&geometry),
            self.gis.zoning_attributes(&geometry),
            self.gis.shape_metrics(parcel_no),
        );

        let merged = merge_stages(
            utility.absorb("utility"),
            boundary.absorb("boundary"),
            zoning.absorb("zoning"),
            shape.absorb("shape_metrics"),
            geometry.to_wkt(),
        );

        let record = PropertyRecord::from_attributes(parcel_no, &merged);

        // The only stage that raises: a silent persistence failure would
        // break the at-least-recorded guarantee
        self.store.insert(&record).await?;

        tracing::info!(
            parcel_no = %parcel_no,
            fields = merged.len(),
            "Parcel recorded"
        );
        Ok(EnrichmentOutcome::Recorded)
    }
}
