//! Database access for bhp-api
//!
//! PostgreSQL with PostGIS; the `properties` table carries a native
//! polygon column in the Bahrain State Grid.

pub mod properties;
pub mod status;

use bhp_common::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Initialize database connection pool and schema
pub async fn init_database_pool(database_url: &str) -> Result<PgPool> {
    tracing::debug!("Connecting to database");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the two tables if they don't exist
async fn init_tables(pool: &PgPool) -> Result<()> {
    sqlx::query("CREATE EXTENSION IF NOT EXISTS postgis")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS properties (
            parcel_no TEXT PRIMARY KEY,
            ewa_edd TEXT,
            ewa_wdd TEXT,
            roads TEXT,
            sewer TEXT,
            gated_community TEXT,
            block_no TEXT,
            area_name_en TEXT,
            area_name_ar TEXT,
            governorate TEXT,
            min_ref TEXT,
            nzp_objectid BIGINT,
            nzp_code TEXT,
            nzp_desc_en TEXT,
            nzp_desc_ar TEXT,
            nzp_date BIGINT,
            shape_area DOUBLE PRECISION,
            shape_len DOUBLE PRECISION,
            longitude DOUBLE PRECISION,
            latitude DOUBLE PRECISION,
            geometry geometry(Polygon, 20439),
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS parcel_status (
            parcel_no TEXT PRIMARY KEY,
            in_database BOOLEAN NOT NULL DEFAULT false,
            confirmed_nonexistent BOOLEAN NOT NULL DEFAULT false,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (properties, parcel_status)");

    Ok(())
}
