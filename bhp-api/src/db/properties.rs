//! Properties table operations
//!
//! Point lookups for the existence gate, the transactional enrichment
//! write, and the read queries behind the parcel and coordinates routes.

use async_trait::async_trait;
use bhp_common::Result;
use serde::Serialize;
use sqlx::{PgPool, Row};

use crate::models::PropertyRecord;
use crate::services::PropertyStore;

use super::status;

/// Subset of a property row returned by `GET /parcels/:parcel_no`
#[derive(Debug, Clone, Serialize)]
pub struct PropertyRow {
    pub parcel_no: String,
    pub ewa_edd: Option<String>,
    pub ewa_wdd: Option<String>,
    pub roads: Option<String>,
    pub sewer: Option<String>,
    pub nzp_code: Option<String>,
    pub shape_area: Option<f64>,
    pub block_no: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
}

/// One parcel's stored geometry as GeoJSON (WGS84)
#[derive(Debug, Clone)]
pub struct ParcelGeometry {
    pub parcel_no: String,
    pub geojson: serde_json::Value,
}

/// Load the attribute row for one parcel
pub async fn fetch_parcel(pool: &PgPool, parcel_no: &str) -> Result<Option<PropertyRow>> {
    let row = sqlx::query(
        r#"
        SELECT parcel_no, ewa_edd, ewa_wdd, roads, sewer, nzp_code,
               shape_area, block_no, longitude, latitude
        FROM properties
        WHERE parcel_no = $1
        "#,
    )
    .bind(parcel_no)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| PropertyRow {
        parcel_no: row.get("parcel_no"),
        ewa_edd: row.get("ewa_edd"),
        ewa_wdd: row.get("ewa_wdd"),
        roads: row.get("roads"),
        sewer: row.get("sewer"),
        nzp_code: row.get("nzp_code"),
        shape_area: row.get("shape_area"),
        block_no: row.get("block_no"),
        longitude: row.get("longitude"),
        latitude: row.get("latitude"),
    }))
}

/// Load every recorded parcel's geometry, reprojected to WGS84 GeoJSON
pub async fn fetch_coordinates(pool: &PgPool) -> Result<Vec<ParcelGeometry>> {
    let rows = sqlx::query(
        r#"
        SELECT parcel_no, ST_AsGeoJSON(ST_Transform(geometry, 4326)) AS geojson
        FROM properties
        WHERE geometry IS NOT NULL
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut parcels = Vec::with_capacity(rows.len());
    for row in rows {
        let parcel_no: String = row.get("parcel_no");
        let geojson: String = row.get("geojson");

        match serde_json::from_str(&geojson) {
            Ok(geojson) => parcels.push(ParcelGeometry { parcel_no, geojson }),
            Err(err) => {
                tracing::warn!(parcel_no = %parcel_no, error = %err, "Skipping unparseable geometry");
            }
        }
    }

    Ok(parcels)
}

/// PostgreSQL-backed property store
#[derive(Debug, Clone)]
pub struct PgPropertyStore {
    pool: PgPool,
}

impl PgPropertyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PropertyStore for PgPropertyStore {
    async fn exists(&self, parcel_no: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM properties WHERE parcel_no = $1")
            .bind(parcel_no)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    async fn mark_invalid(&self, parcel_no: &str) -> Result<()> {
        status::mark_invalid(&self.pool, parcel_no).await
    }

    /// One transaction: property insert plus present-status upsert.
    ///
    /// The geometry arrives as WKT and is stored as a native polygon in
    /// the Bahrain State Grid; longitude/latitude are derived from its
    /// WGS84 centroid at write time.
    async fn insert(&self, record: &PropertyRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO properties (
                parcel_no, ewa_edd, ewa_wdd, roads, sewer, gated_community,
                block_no, area_name_en, area_name_ar, governorate, min_ref,
                nzp_objectid, nzp_code, nzp_desc_en, nzp_desc_ar, nzp_date,
                shape_area, shape_len, geometry, longitude, latitude
            ) VALUES (
                $1, $2, $3, $4, $5, $6,
                $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16,
                $17, $18,
                ST_GeomFromText($19, 20439),
                ST_X(ST_Centroid(ST_Transform(ST_GeomFromText($19, 20439), 4326))),
                ST_Y(ST_Centroid(ST_Transform(ST_GeomFromText($19, 20439), 4326)))
            )
            ON CONFLICT (parcel_no) DO UPDATE SET
                ewa_edd = EXCLUDED.ewa_edd,
                ewa_wdd = EXCLUDED.ewa_wdd,
                roads = EXCLUDED.roads,
                sewer = EXCLUDED.sewer,
                gated_community = EXCLUDED.gated_community,
                block_no = EXCLUDED.block_no,
                area_name_en = EXCLUDED.area_name_en,
                area_name_ar = EXCLUDED.area_name_ar,
                governorate = EXCLUDED.governorate,
                min_ref = EXCLUDED.min_ref,
                nzp_objectid = EXCLUDED.nzp_objectid,
                nzp_code = EXCLUDED.nzp_code,
                nzp_desc_en = EXCLUDED.nzp_desc_en,
                nzp_desc_ar = EXCLUDED.nzp_desc_ar,
                nzp_date = EXCLUDED.nzp_date,
                shape_area = EXCLUDED.shape_area,
                shape_len = EXCLUDED.shape_len,
                geometry = EXCLUDED.geometry,
                longitude = EXCLUDED.longitude,
                latitude = EXCLUDED.latitude,
                updated_at = now()
            "#,
        )
        .bind(&record.parcel_no)
        .bind(&record.ewa_edd)
        .bind(&record.ewa_wdd)
        .bind(&record.roads)
        .bind(&record.sewer)
        .bind(&record.gated_community)
        .bind(&record.block_no)
        .bind(&record.area_name_en)
        .bind(&record.area_name_ar)
        .bind(&record.governorate)
        .bind(&record.min_ref)
        .bind(record.nzp_objectid)
        .bind(&record.nzp_code)
        .bind(&record.nzp_desc_en)
        .bind(&record.nzp_desc_ar)
        .bind(record.nzp_date)
        .bind(record.shape_area)
        .bind(record.shape_len)
        .bind(&record.geometry_wkt)
        .execute(&mut *tx)
        .await?;

        status::mark_present(&mut *tx, &record.parcel_no).await?;

        tx.commit().await?;

        tracing::debug!(parcel_no = %record.parcel_no, "Property row committed");
        Ok(())
    }
}
