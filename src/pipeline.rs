//! Uplink processing: one coordinated pass from raw receptions to a linked
//! best measurement.
//!
//! One uplink maps to one request-scoped operation with sequential awaits and
//! no shared in-process state. Two uplinks for the same coordinates arriving
//! concurrently race on the supersede-then-create sequence; last write wins.

use thiserror::Error;
use uuid::Uuid;

use crate::models::{best_measurement, build_measurements};
use crate::store::PointStore;
use crate::{GeoPoint, RawReception};

// ---

/// Failure modes of one uplink-processing operation.
///
/// Invalid input is rejected before any write; a storage failure aborts the
/// operation at the failing step with no compensating rollback of earlier
/// steps.
#[derive(Debug, Error)]
pub enum UplinkError {
    // ---
    #[error("invalid uplink: {0}")]
    InvalidUplink(&'static str),

    #[error("storage operation failed: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Result of a successfully processed uplink.
///
/// `best_measurement_id` is `None` when the reception list was empty after
/// the self-test gateway filter; that is still a success.
#[derive(Debug)]
pub struct UplinkOutcome {
    // ---
    pub point_id: Uuid,
    pub best_measurement_id: Option<Uuid>,
}

// ---

/// Process one uplink: supersede any point at the same coordinates, create a
/// new one, persist scored measurements, and link the best.
///
/// Steps, in order:
/// 1. Reject an empty reception list before touching storage.
/// 2. Look up a point at exactly `(latitude, longitude)`; if found, delete it
///    and its measurements.
/// 3. Create the new point with no best measurement.
/// 4. Normalize the receptions, dropping the configured self-test gateway.
/// 5. An empty batch after filtering succeeds with `best_measurement_id = None`.
/// 6. Otherwise insert the batch, pick the highest-quality measurement, and
///    link it on the point.
pub async fn process_uplink<S: PointStore>(
    store: &S,
    latitude: f64,
    longitude: f64,
    receptions: &[RawReception],
    excluded_gateway: Option<&str>,
) -> Result<UplinkOutcome, UplinkError> {
    // ---
    if receptions.is_empty() {
        return Err(UplinkError::InvalidUplink(
            "rx_metadata is missing or empty",
        ));
    }

    if let Some(existing) = store.find_point_at(latitude, longitude).await? {
        tracing::debug!(
            "Superseding point {} at ({}, {})",
            existing.id,
            latitude,
            longitude
        );
        store.delete_point(existing.id).await?;
    }

    let point = GeoPoint::new(latitude, longitude);
    store.create_point(&point).await?;

    let measurements = build_measurements(receptions, point.id, excluded_gateway);
    if measurements.is_empty() {
        tracing::info!(
            "Point {} created with no qualifying receptions, best left unset",
            point.id
        );
        return Ok(UplinkOutcome {
            point_id: point.id,
            best_measurement_id: None,
        });
    }

    store.insert_measurements(&measurements).await?;

    // Non-empty by the check above, so the selector cannot come back empty.
    let best = best_measurement(&measurements)
        .ok_or(UplinkError::InvalidUplink("no measurement to select"))?;
    store.link_best_measurement(point.id, best.id).await?;

    tracing::info!(
        "Point {} stored with {} measurements, best {} (gateway {}, quality {})",
        point.id,
        measurements.len(),
        best.id,
        best.gateway_id,
        best.quality
    );

    Ok(UplinkOutcome {
        point_id: point.id,
        best_measurement_id: Some(best.id),
    })
}
