//! Persistence layer for geo-points and their quality measurements.
//!
//! The supersede-on-coordinate policy treats the exact `(latitude, longitude)`
//! pair as the durable identity of a point, and the delete-then-create
//! sequence is not transactional across steps. Both are deliberate carryovers
//! of the service's observed behavior; keeping them behind [`PointStore`]
//! means the policy can later move to a rounded-coordinate key or a versioned
//! row without touching the scoring pipeline.

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{GeoPoint, Measurement};

// ---

/// Storage operations the uplink pipeline needs.
#[allow(async_fn_in_trait)]
pub trait PointStore {
    // ---
    /// Find the point whose coordinates exactly equal `(latitude, longitude)`.
    /// No tolerance or rounding is applied.
    async fn find_point_at(&self, latitude: f64, longitude: f64) -> Result<Option<GeoPoint>>;

    /// Delete a point together with all measurements it owns. Measurements go
    /// first so a partial failure never leaves orphaned rows.
    async fn delete_point(&self, point_id: Uuid) -> Result<()>;

    /// Insert a new point. `best_quality` is expected to be unset.
    async fn create_point(&self, point: &GeoPoint) -> Result<()>;

    /// Insert a batch of measurements tied to an existing point.
    async fn insert_measurements(&self, measurements: &[Measurement]) -> Result<()>;

    /// Point the given geo-point's `best_quality` at one of its measurements.
    async fn link_best_measurement(&self, point_id: Uuid, measurement_id: Uuid) -> Result<()>;
}

// ---

/// PostgreSQL-backed [`PointStore`].
#[derive(Clone)]
pub struct PgPointStore {
    pool: PgPool,
}

impl PgPointStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl PointStore for PgPointStore {
    // ---
    async fn find_point_at(&self, latitude: f64, longitude: f64) -> Result<Option<GeoPoint>> {
        // ---
        let point = sqlx::query_as::<_, GeoPoint>(
            r#"
            SELECT id, latitude, longitude, best_quality, created_at
            FROM geo_points
            WHERE latitude = $1 AND longitude = $2
            LIMIT 1
            "#,
        )
        .bind(latitude)
        .bind(longitude)
        .fetch_optional(&self.pool)
        .await?;

        Ok(point)
    }

    async fn delete_point(&self, point_id: Uuid) -> Result<()> {
        // ---
        sqlx::query("DELETE FROM quality_measurements WHERE point_id = $1")
            .bind(point_id)
            .execute(&self.pool)
            .await?;

        sqlx::query("DELETE FROM geo_points WHERE id = $1")
            .bind(point_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn create_point(&self, point: &GeoPoint) -> Result<()> {
        // ---
        sqlx::query(
            r#"
            INSERT INTO geo_points (id, latitude, longitude, best_quality, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(point.id)
        .bind(point.latitude)
        .bind(point.longitude)
        .bind(point.best_quality)
        .bind(point.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_measurements(&self, measurements: &[Measurement]) -> Result<()> {
        // ---
        for m in measurements {
            sqlx::query(
                r#"
                INSERT INTO quality_measurements (
                    id, point_id, gateway_id, rssi, snr, quality, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(m.id)
            .bind(m.point_id)
            .bind(&m.gateway_id)
            .bind(m.rssi)
            .bind(m.snr)
            .bind(m.quality)
            .bind(m.created_at)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    async fn link_best_measurement(&self, point_id: Uuid, measurement_id: Uuid) -> Result<()> {
        // ---
        sqlx::query("UPDATE geo_points SET best_quality = $1 WHERE id = $2")
            .bind(measurement_id)
            .bind(point_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
