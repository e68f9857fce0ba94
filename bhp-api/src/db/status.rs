//! Parcel status bookkeeping
//!
//! One row per parcel with the `(in_database, confirmed_nonexistent)` flag
//! pair. Both paths write the full pair in a single upsert, so no state
//! with both flags set is ever observable.

use bhp_common::Result;
use sqlx::PgExecutor;

/// Upsert the present-in-database status.
///
/// Runs inside the same transaction as the property insert; failure here
/// rolls the insert back with it.
pub async fn mark_present<'e, E>(executor: E, parcel_no: &str) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO parcel_status (parcel_no, in_database, confirmed_nonexistent, updated_at)
        VALUES ($1, true, false, now())
        ON CONFLICT (parcel_no) DO UPDATE SET
            in_database = true,
            confirmed_nonexistent = false,
            updated_at = now()
        "#,
    )
    .bind(parcel_no)
    .execute(executor)
    .await?;

    Ok(())
}

/// Upsert the confirmed-nonexistent status
pub async fn mark_invalid<'e, E>(executor: E, parcel_no: &str) -> Result<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO parcel_status (parcel_no, in_database, confirmed_nonexistent, updated_at)
        VALUES ($1, false, true, now())
        ON CONFLICT (parcel_no) DO UPDATE SET
            in_database = false,
            confirmed_nonexistent = true,
            updated_at = now()
        "#,
    )
    .bind(parcel_no)
    .execute(executor)
    .await?;

    Ok(())
}
