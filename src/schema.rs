//! Database schema management for `lora-coverage-map`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the `geo_points` table for uplink locations and the
/// `quality_measurements` table for per-gateway scored receptions. Safe to
/// call on every startup; no-op if objects already exist.
///
/// `best_quality` is left as a plain nullable UUID rather than a foreign key:
/// the point row is updated after its measurements are inserted, and the
/// supersede path deletes measurements first.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // One row per uplink event, keyed in practice by (latitude, longitude)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS geo_points (
            id           UUID PRIMARY KEY,
            latitude     DOUBLE PRECISION NOT NULL,
            longitude    DOUBLE PRECISION NOT NULL,
            best_quality UUID,
            created_at   TIMESTAMPTZ NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // One row per gateway reception, owned by a geo point
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quality_measurements (
            id         UUID PRIMARY KEY,
            point_id   UUID NOT NULL REFERENCES geo_points (id) ON DELETE CASCADE,
            gateway_id TEXT NOT NULL,
            rssi       DOUBLE PRECISION NOT NULL,
            snr        DOUBLE PRECISION NOT NULL,
            quality    DOUBLE PRECISION NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Exact-match coordinate lookup for the supersede path
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_geo_points_coordinates
            ON geo_points (latitude, longitude);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_quality_measurements_point_id
            ON quality_measurements (point_id);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
