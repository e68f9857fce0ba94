//! Parcel geometry model
//!
//! Cadastral parcels are polygons in the Bahrain State Grid (Ain el Abd,
//! WKID 20439). The query services exchange geometry as Esri JSON rings;
//! the database stores it as a PostGIS polygon built from WKT.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Projected CRS used by the cadastral services and the `properties` table
/// (Ain el Abd / Bahrain State Grid).
pub const BAHRAIN_GRID_WKID: u32 = 20439;

/// Parcel polygon as an ordered sequence of coordinate rings.
///
/// The first ring is the outer boundary. Immutable once resolved from the
/// cadastral service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Coordinate rings, outer boundary first
    pub rings: Vec<Vec<(f64, f64)>>,
}

impl Geometry {
    /// Create a geometry from Esri-style rings
    pub fn new(rings: Vec<Vec<(f64, f64)>>) -> Self {
        Self { rings }
    }

    /// True if there is no usable outer ring
    pub fn is_empty(&self) -> bool {
        self.rings.first().map_or(true, |r| r.len() < 3)
    }

    /// Outer boundary ring, if present
    pub fn outer_ring(&self) -> Option<&[(f64, f64)]> {
        self.rings.first().map(|r| r.as_slice())
    }

    /// Convert to a WKT POLYGON for storage.
    ///
    /// Only the outer ring is kept; interior rings (donut parcels) are
    /// dropped, matching what the upstream system stored. The ring is
    /// closed if the source data left it open.
    pub fn to_wkt(&self) -> Option<String> {
        let ring = self.rings.first()?;
        if ring.len() < 3 {
            return None;
        }

        let mut points: Vec<String> = ring.iter().map(|(x, y)| format!("{} {}", x, y)).collect();

        // Close the ring if the service returned it open
        if ring.first() != ring.last() {
            let (x, y) = ring[0];
            points.push(format!("{} {}", x, y));
        }

        Some(format!("POLYGON (({}))", points.join(", ")))
    }

    /// Serialize as the Esri JSON polygon used in query-string geometry
    /// parameters: `{"rings": [...], "spatialReference": {"wkid": 20439}}`.
    pub fn to_esri_json(&self) -> String {
        json!({
            "rings": self.rings,
            "spatialReference": { "wkid": BAHRAIN_GRID_WKID },
        })
        .to_string()
    }

    /// Bounding box of the outer ring as (xmin, ymin, xmax, ymax).
    ///
    /// Used for the `mapExtent` parameter of identify queries.
    pub fn extent(&self) -> Option<(f64, f64, f64, f64)> {
        let ring = self.rings.first()?;
        let (first, rest) = ring.split_first()?;

        let mut ext = (first.0, first.1, first.0, first.1);
        for (x, y) in rest {
            ext.0 = ext.0.min(*x);
            ext.1 = ext.1.min(*y);
            ext.2 = ext.2.max(*x);
            ext.3 = ext.3.max(*y);
        }
        Some(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Geometry {
        Geometry::new(vec![vec![
            (0.0, 0.0),
            (1.0, 0.0),
            (1.0, 1.0),
            (0.0, 1.0),
            (0.0, 0.0),
        ]])
    }

    #[test]
    fn test_wkt_from_closed_ring() {
        let wkt = unit_square().to_wkt().unwrap();
        assert_eq!(wkt, "POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))");
    }

    #[test]
    fn test_wkt_closes_open_ring() {
        let geom = Geometry::new(vec![vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]]);
        assert_eq!(geom.to_wkt().unwrap(), "POLYGON ((0 0, 1 0, 1 1, 0 0))");
    }

    #[test]
    fn test_wkt_keeps_fractional_coordinates() {
        let geom = Geometry::new(vec![vec![
            (451234.25, 2895678.5),
            (451250.75, 2895678.5),
            (451250.75, 2895700.0),
            (451234.25, 2895678.5),
        ]]);
        assert_eq!(
            geom.to_wkt().unwrap(),
            "POLYGON ((451234.25 2895678.5, 451250.75 2895678.5, 451250.75 2895700, 451234.25 2895678.5))"
        );
    }

    #[test]
    fn test_wkt_requires_outer_ring() {
        assert!(Geometry::new(vec![]).to_wkt().is_none());
        assert!(Geometry::new(vec![vec![(0.0, 0.0), (1.0, 1.0)]]).to_wkt().is_none());
    }

    #[test]
    fn test_wkt_drops_interior_rings() {
        let mut geom = unit_square();
        geom.rings.push(vec![
            (0.25, 0.25),
            (0.75, 0.25),
            (0.75, 0.75),
            (0.25, 0.25),
        ]);
        // Only the outer boundary survives conversion
        assert_eq!(geom.to_wkt().unwrap(), "POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))");
    }

    #[test]
    fn test_esri_json_shape() {
        let value: serde_json::Value =
            serde_json::from_str(&unit_square().to_esri_json()).unwrap();
        assert_eq!(value["spatialReference"]["wkid"], 20439);
        assert_eq!(value["rings"][0][1][0], 1.0);
        assert_eq!(value["rings"][0][1][1], 0.0);
    }

    #[test]
    fn test_extent() {
        let (xmin, ymin, xmax, ymax) = unit_square().extent().unwrap();
        assert_eq!((xmin, ymin, xmax, ymax), (0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn test_empty_geometry() {
        assert!(Geometry::new(vec![]).is_empty());
        assert!(!unit_square().is_empty());
    }
}
