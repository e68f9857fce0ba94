//! Enrichment pipeline integration tests
//!
//! Exercises the orchestrator end to end against fake store and gateway
//! implementations: short-circuiting, invalid marking, merge precedence,
//! idempotence, partial-fetch resilience, and persistence failure.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bhp_api::models::{AttributeMap, EnrichmentOutcome, PropertyRecord};
use bhp_api::services::{EnrichmentService, GisError, GisGateway, Lookup, PropertyStore};
use bhp_common::geometry::Geometry;
use bhp_common::{Error, Result};

/// Store double with shared handles for post-hoc assertions
#[derive(Clone, Default)]
struct FakeStore {
    records: Arc<Mutex<Vec<PropertyRecord>>>,
    invalid: Arc<Mutex<Vec<String>>>,
    fail_exists: bool,
    fail_insert: bool,
}

impl FakeStore {
    fn inserted(&self) -> Vec<PropertyRecord> {
        self.records.lock().unwrap().clone()
    }

    fn invalid_marks(&self) -> Vec<String> {
        self.invalid.lock().unwrap().clone()
    }
}

#[async_trait]
impl PropertyStore for FakeStore {
    async fn exists(&self, parcel_no: &str) -> Result<bool> {
        if self.fail_exists {
            return Err(Error::Internal("store offline".to_string()));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.parcel_no == parcel_no))
    }

    async fn mark_invalid(&self, parcel_no: &str) -> Result<()> {
        self.invalid.lock().unwrap().push(parcel_no.to_string());
        Ok(())
    }

    async fn insert(&self, record: &PropertyRecord) -> Result<()> {
        if self.fail_insert {
            return Err(Error::Internal("simulated transaction failure".to_string()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Per-stage behavior of the gateway double
#[derive(Clone, Default)]
enum Stage {
    #[default]
    Miss,
    Hit(AttributeMap),
    Fail,
}

impl Stage {
    fn hit(pairs: &[(&str, serde_json::Value)]) -> Self {
        Stage::Hit(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    fn lookup(&self) -> Lookup<AttributeMap> {
        match self {
            Stage::Miss => Lookup::Miss,
            Stage::Hit(map) => Lookup::Hit(map.clone()),
            Stage::Fail => Lookup::Failed(GisError::Network("simulated timeout".to_string())),
        }
    }
}

/// Gateway double counting every outbound lookup
#[derive(Clone, Default)]
struct FakeGis {
    geometry: Option<Geometry>,
    utility: Stage,
    boundary: Stage,
    zoning: Stage,
    shape: Stage,
    calls: Arc<AtomicUsize>,
}

impl FakeGis {
    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GisGateway for FakeGis {
    async fn resolve_geometry(&self, _parcel_no: &str) -> Lookup<Geometry> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.geometry {
            Some(geometry) => Lookup::Hit(geometry.clone()),
            None => Lookup::Miss,
        }
    }

    async fn utility_attributes(
        &self,
        _parcel_no: &str,
        _geometry: &Geometry,
    ) -> Lookup<AttributeMap> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.utility.lookup()
    }

    async fn boundary_attributes(&self, _geometry: &Geometry) -> Lookup<AttributeMap> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.boundary.lookup()
    }

    async fn zoning_attributes(&self, _geometry: &Geometry) -> Lookup<AttributeMap> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.zoning.lookup()
    }

    async fn shape_metrics(&self, _parcel_no: &str) -> Lookup<AttributeMap> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.shape.lookup()
    }
}

fn unit_square() -> Geometry {
    Geometry::new(vec![vec![
        (0.0, 0.0),
        (1.0, 0.0),
        (1.0, 1.0),
        (0.0, 1.0),
        (0.0, 0.0),
    ]])
}

#[tokio::test]
async fn test_recorded_parcel_short_circuits_without_gis_calls() {
    let store = FakeStore::default();
    store.records.lock().unwrap().push(PropertyRecord::from_attributes(
        "12345",
        &AttributeMap::new(),
    ));

    let gis = FakeGis::default();
    let service = EnrichmentService::new(store.clone(), gis.clone());

    let outcome = service.ensure_recorded("12345").await.unwrap();

    assert_eq!(outcome, EnrichmentOutcome::AlreadyRecorded);
    assert_eq!(gis.call_count(), 0);
}

#[tokio::test]
async fn test_unresolvable_parcel_marked_invalid_without_row() {
    let store = FakeStore::default();
    let gis = FakeGis::default(); // no geometry

    let service = EnrichmentService::new(store.clone(), gis.clone());
    let outcome = service.ensure_recorded("99999").await.unwrap();

    assert_eq!(outcome, EnrichmentOutcome::Invalid);
    assert_eq!(store.invalid_marks(), vec!["99999".to_string()]);
    assert!(store.inserted().is_empty());
}

#[tokio::test]
async fn test_end_to_end_merge_and_persist() {
    let store = FakeStore::default();
    let gis = FakeGis {
        geometry: Some(unit_square()),
        utility: Stage::hit(&[("ewa_edd", json!("X"))]),
        shape: Stage::hit(&[("shape_area", json!(999.99))]),
        ..FakeGis::default()
    };

    let service = EnrichmentService::new(store.clone(), gis);
    let outcome = service.ensure_recorded("12345").await.unwrap();

    assert_eq!(outcome, EnrichmentOutcome::Recorded);

    let inserted = store.inserted();
    assert_eq!(inserted.len(), 1);
    let record = &inserted[0];
    assert_eq!(record.parcel_no, "12345");
    assert_eq!(record.ewa_edd.as_deref(), Some("X"));
    assert_eq!(record.shape_area, Some(999.99));
    assert_eq!(
        record.geometry_wkt.as_deref(),
        Some("POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))")
    );

    // A subsequent existence check sees the parcel
    assert!(store.exists("12345").await.unwrap());
}

#[tokio::test]
async fn test_second_call_is_idempotent() {
    let store = FakeStore::default();
    let gis = FakeGis {
        geometry: Some(unit_square()),
        utility: Stage::hit(&[("ewa_edd", json!("X"))]),
        ..FakeGis::default()
    };

    let service = EnrichmentService::new(store.clone(), gis.clone());

    assert_eq!(
        service.ensure_recorded("12345").await.unwrap(),
        EnrichmentOutcome::Recorded
    );
    let calls_after_first = gis.call_count();

    assert_eq!(
        service.ensure_recorded("12345").await.unwrap(),
        EnrichmentOutcome::AlreadyRecorded
    );

    assert_eq!(store.inserted().len(), 1);
    assert_eq!(gis.call_count(), calls_after_first);
}

#[tokio::test]
async fn test_partial_fetch_still_persists() {
    let store = FakeStore::default();
    let gis = FakeGis {
        geometry: Some(unit_square()),
        utility: Stage::Fail,
        boundary: Stage::Fail,
        zoning: Stage::Fail,
        shape: Stage::hit(&[("shape_area", json!(450.5)), ("shape_len", json!(90.0))]),
        ..FakeGis::default()
    };

    let service = EnrichmentService::new(store.clone(), gis);
    let outcome = service.ensure_recorded("777").await.unwrap();

    assert_eq!(outcome, EnrichmentOutcome::Recorded);

    let record = &store.inserted()[0];
    assert_eq!(record.shape_area, Some(450.5));
    assert_eq!(record.shape_len, Some(90.0));
    assert!(record.geometry_wkt.is_some());
    // Failed stages left their fields absent
    assert_eq!(record.ewa_edd, None);
    assert_eq!(record.block_no, None);
    assert_eq!(record.nzp_code, None);
}

#[tokio::test]
async fn test_persistence_failure_propagates_and_leaves_status_untouched() {
    let store = FakeStore {
        fail_insert: true,
        ..FakeStore::default()
    };
    let gis = FakeGis {
        geometry: Some(unit_square()),
        utility: Stage::hit(&[("ewa_edd", json!("X"))]),
        ..FakeGis::default()
    };

    let service = EnrichmentService::new(store.clone(), gis);
    let result = service.ensure_recorded("12345").await;

    assert!(result.is_err());
    assert!(store.inserted().is_empty());
    assert!(store.invalid_marks().is_empty());
}

#[tokio::test]
async fn test_existence_check_failure_fails_open() {
    let store = FakeStore {
        fail_exists: true,
        ..FakeStore::default()
    };
    let gis = FakeGis {
        geometry: Some(unit_square()),
        ..FakeGis::default()
    };

    let service = EnrichmentService::new(store.clone(), gis.clone());
    let outcome = service.ensure_recorded("12345").await.unwrap();

    // The failed existence check degrades to "absent" and the pipeline runs
    assert_eq!(outcome, EnrichmentOutcome::Recorded);
    assert!(gis.call_count() > 0);
    assert_eq!(store.inserted().len(), 1);
}

#[tokio::test]
async fn test_merge_precedence_later_stage_wins() {
    let store = FakeStore::default();
    let gis = FakeGis {
        geometry: Some(unit_square()),
        // Stage A and stage C disagree on nzp_code; C merges later
        utility: Stage::hit(&[("nzp_code", json!("OLD"))]),
        zoning: Stage::hit(&[("nzp_code", json!("RA"))]),
        ..FakeGis::default()
    };

    let service = EnrichmentService::new(store.clone(), gis);
    service.ensure_recorded("12345").await.unwrap();

    assert_eq!(store.inserted()[0].nzp_code.as_deref(), Some("RA"));
}
