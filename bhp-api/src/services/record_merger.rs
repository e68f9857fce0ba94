//! Attribute record merging
//!
//! Folds the (possibly absent) stage results into one attribute record in
//! fixed stage order, geometry last, last-write-wins per field name. Pure:
//! values pass through untouched and nothing here validates types.

use crate::models::AttributeMap;

/// Merge the four stage results plus the derived geometry WKT.
///
/// Stage order is fixed (A: utility, B: boundary, C: zoning, D: shape
/// metrics) regardless of which order the fetches completed in; a later
/// stage overwrites an earlier one on key collision, and the geometry
/// field wins over everything.
pub fn merge_stages(
    utility: Option<AttributeMap>,
    boundary: Option<AttributeMap>,
    zoning: Option<AttributeMap>,
    shape: Option<AttributeMap>,
    geometry_wkt: Option<String>,
) -> AttributeMap {
    let mut merged = AttributeMap::new();

    for stage in [utility, boundary, zoning, shape].into_iter().flatten() {
        for (key, value) in stage {
            merged.insert(key, value);
        }
    }

    if let Some(wkt) = geometry_wkt {
        merged.insert("geometry".to_string(), wkt.into());
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(pairs: &[(&str, serde_json::Value)]) -> AttributeMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_later_stage_wins_on_collision() {
        let a = map(&[("x", json!(1))]);
        let c = map(&[("x", json!(2))]);

        let merged = merge_stages(Some(a), None, Some(c), None, None);
        assert_eq!(merged["x"], json!(2));
    }

    #[test]
    fn test_tolerates_any_subset_of_stages() {
        let merged = merge_stages(None, None, None, None, None);
        assert!(merged.is_empty());

        let d = map(&[("shape_area", json!(999.99))]);
        let merged = merge_stages(None, None, None, Some(d), Some("POLYGON EMPTY".into()));
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["shape_area"], json!(999.99));
    }

    #[test]
    fn test_geometry_merges_last() {
        let a = map(&[("geometry", json!("stage-supplied"))]);
        let merged = merge_stages(Some(a), None, None, None, Some("POLYGON ((0 0, 1 0, 1 1, 0 0))".into()));
        assert_eq!(merged["geometry"], json!("POLYGON ((0 0, 1 0, 1 1, 0 0))"));
    }

    #[test]
    fn test_disjoint_stages_accumulate() {
        let a = map(&[("ewa_edd", json!("X"))]);
        let b = map(&[("block_no", json!("321"))]);
        let c = map(&[("nzp_code", json!("RA")), ("nzp_date", json!(2019))]);
        let d = map(&[("shape_area", json!(450.5))]);

        let merged = merge_stages(Some(a), Some(b), Some(c), Some(d), Some("POLYGON ((0 0, 1 0, 1 1, 0 0))".into()));

        assert_eq!(merged.len(), 6);
        assert_eq!(merged["ewa_edd"], json!("X"));
        assert_eq!(merged["block_no"], json!("321"));
        assert_eq!(merged["nzp_date"], json!(2019));
    }
}
