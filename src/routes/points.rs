//! Read endpoints backing the coverage map.
//!
//! `GET /api/quality-points` returns every point with its best quality score
//! in the shape the hexagon-aggregation map layer consumes. The per-point
//! route returns the individual gateway measurements behind one point.

use axum::{
    extract::Path, extract::State, http::StatusCode, response::IntoResponse, routing::get, Json,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::Config;

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new()
        .route("/api/quality-points", get(list_points))
        .route("/api/quality-points/{point_id}", get(point_measurements))
}

/// One map entry. Field names match what the frontend's aggregation layer
/// expects, hence the capitalization.
#[derive(Debug, Serialize, sqlx::FromRow)]
struct MapPoint {
    // ---
    #[serde(rename = "COORDINATES")]
    #[sqlx(skip)]
    coordinates: [f64; 2],
    #[serde(skip)]
    latitude: f64,
    #[serde(skip)]
    longitude: f64,
    #[serde(rename = "SCORE")]
    score: f64,
}

/// One measurement row in the per-point response.
#[derive(Debug, Serialize, sqlx::FromRow)]
struct MeasurementView {
    // ---
    id: Uuid,
    point_id: Uuid,
    gateway_id: String,
    quality: f64,
    created_at: DateTime<Utc>,
    #[sqlx(skip)]
    formatted_date: String,
}

// ---

/// Handle `GET /api/quality-points`.
///
/// Points without a linked best measurement are reported with score 0 so the
/// map still shows where coverage was attempted.
async fn list_points(State((pool, _config)): State<(PgPool, Config)>) -> impl IntoResponse {
    // ---
    let rows = sqlx::query_as::<_, MapPoint>(
        r#"
        SELECT p.latitude, p.longitude, COALESCE(m.quality, 0.0) AS score
        FROM geo_points p
        LEFT JOIN quality_measurements m ON m.id = p.best_quality
        "#,
    )
    .fetch_all(&pool)
    .await;

    match rows {
        Ok(mut points) => {
            for p in &mut points {
                p.coordinates = [p.latitude, p.longitude];
            }
            info!("GET /api/quality-points - returning {} points", points.len());
            (StatusCode::OK, Json(points)).into_response()
        }
        Err(e) => {
            error!("Failed to load quality points: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "failed to load quality points" })),
            )
                .into_response()
        }
    }
}

/// Handle `GET /api/quality-points/{point_id}`.
///
/// Returns 404 with a message when the point has no measurements (or does not
/// exist); the two cases are indistinguishable to the map popup and are
/// reported the same way.
async fn point_measurements(
    State((pool, _config)): State<(PgPool, Config)>,
    Path(point_id): Path<Uuid>,
) -> impl IntoResponse {
    // ---
    let rows = sqlx::query_as::<_, MeasurementView>(
        r#"
        SELECT id, point_id, gateway_id, quality, created_at
        FROM quality_measurements
        WHERE point_id = $1
        ORDER BY quality DESC
        "#,
    )
    .bind(point_id)
    .fetch_all(&pool)
    .await;

    match rows {
        Ok(measurements) if measurements.is_empty() => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "no gateway coverage recorded for this point" })),
        )
            .into_response(),
        Ok(mut measurements) => {
            for m in &mut measurements {
                m.formatted_date = m.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string();
            }
            (StatusCode::OK, Json(measurements)).into_response()
        }
        Err(e) => {
            error!("Failed to load measurements for point {}: {}", point_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "failed to load measurements" })),
            )
                .into_response()
        }
    }
}
