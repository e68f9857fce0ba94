//! Domain models for the enrichment pipeline

use serde::Serialize;
use serde_json::{Map, Value};

/// Attribute record accumulated across the fetch stages.
///
/// Values pass through as received from the GIS services (string, number,
/// or null); absent fields are omitted, not zero-filled.
pub type AttributeMap = Map<String, Value>;

/// Terminal outcome of one `ensure_recorded` operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentOutcome {
    /// Parcel was already present in the properties table
    AlreadyRecorded,
    /// Parcel was fetched, merged, and persisted in this operation
    Recorded,
    /// Cadastral service has no geometry for this parcel number
    Invalid,
}

impl EnrichmentOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            EnrichmentOutcome::AlreadyRecorded => "Parcel already recorded",
            EnrichmentOutcome::Recorded => "Parcel recorded",
            EnrichmentOutcome::Invalid => "Parcel not found in cadastral data",
        }
    }
}

/// Typed view of a merged attribute record, ready for insertion into the
/// `properties` table.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRecord {
    pub parcel_no: String,

    // Stage A: utility / fence layer
    pub ewa_edd: Option<String>,
    pub ewa_wdd: Option<String>,
    pub roads: Option<String>,
    pub sewer: Option<String>,
    pub gated_community: Option<String>,

    // Stage B: administrative boundary identify
    pub block_no: Option<String>,
    pub area_name_en: Option<String>,
    pub area_name_ar: Option<String>,
    pub governorate: Option<String>,
    pub min_ref: Option<String>,

    // Stage C: zoning fence layer
    pub nzp_objectid: Option<i64>,
    pub nzp_code: Option<String>,
    pub nzp_desc_en: Option<String>,
    pub nzp_desc_ar: Option<String>,
    pub nzp_date: Option<i64>,

    // Stage D: cadastral shape metrics
    pub shape_area: Option<f64>,
    pub shape_len: Option<f64>,

    /// WKT polygon derived from the resolved geometry
    pub geometry_wkt: Option<String>,
}

impl PropertyRecord {
    /// Build a typed record from a merged attribute map.
    ///
    /// No validation beyond type coercion: numbers arriving as strings are
    /// parsed, everything else unparseable becomes None.
    pub fn from_attributes(parcel_no: &str, attrs: &AttributeMap) -> Self {
        Self {
            parcel_no: parcel_no.to_string(),
            ewa_edd: str_field(attrs, "ewa_edd"),
            ewa_wdd: str_field(attrs, "ewa_wdd"),
            roads: str_field(attrs, "roads"),
            sewer: str_field(attrs, "sewer"),
            gated_community: str_field(attrs, "gated_community"),
            block_no: str_field(attrs, "block_no"),
            area_name_en: str_field(attrs, "area_name_en"),
            area_name_ar: str_field(attrs, "area_name_ar"),
            governorate: str_field(attrs, "governorate"),
            min_ref: str_field(attrs, "min_ref"),
            nzp_objectid: int_field(attrs, "objectid"),
            nzp_code: str_field(attrs, "nzp_code"),
            nzp_desc_en: str_field(attrs, "nzp_desc_en"),
            nzp_desc_ar: str_field(attrs, "nzp_desc_ar"),
            nzp_date: int_field(attrs, "nzp_date"),
            shape_area: num_field(attrs, "shape_area"),
            shape_len: num_field(attrs, "shape_len"),
            geometry_wkt: str_field(attrs, "geometry"),
        }
    }
}

/// Read a field as a string, coercing numbers
fn str_field(attrs: &AttributeMap, key: &str) -> Option<String> {
    match attrs.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a field as f64, tolerating numeric strings
fn num_field(attrs: &AttributeMap, key: &str) -> Option<f64> {
    match attrs.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a field as i64, tolerating numeric strings and whole floats
fn int_field(attrs: &AttributeMap, key: &str) -> Option<i64> {
    match attrs.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
