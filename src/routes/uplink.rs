//! `POST /uplink-webhook` — the network server's uplink notification hook.
//!
//! One request runs one full pass of the upsert pipeline: supersede any point
//! at the payload's coordinates, score every gateway reception, persist the
//! batch, and link the best measurement. A downlink acknowledgement is then
//! dispatched best-effort; its outcome never changes the HTTP response.

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use tracing::{debug, error, info};

use crate::downlink::DownlinkNotifier;
use crate::pipeline::{process_uplink, UplinkError};
use crate::store::PgPointStore;
use crate::{Config, RawReception};

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new().route("/uplink-webhook", post(handler))
}

/// TTN-v3-shaped uplink notification, reduced to the fields the pipeline
/// consumes.
#[derive(Debug, Deserialize)]
struct UplinkNotification {
    // ---
    #[serde(default)]
    end_device_ids: Option<EndDeviceIds>,
    uplink_message: UplinkMessage,
}

#[derive(Debug, Deserialize)]
struct EndDeviceIds {
    #[serde(default)]
    device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UplinkMessage {
    decoded_payload: DecodedPayload,
    #[serde(default)]
    rx_metadata: Vec<RawReception>,
}

/// Device-decoded position payload.
#[derive(Debug, Deserialize)]
struct DecodedPayload {
    lat: f64,
    lon: f64,
}

// ---

async fn handler(
    State((pool, config)): State<(PgPool, Config)>,
    Json(event): Json<UplinkNotification>,
) -> impl IntoResponse {
    // ---
    let device_id = event
        .end_device_ids
        .as_ref()
        .and_then(|ids| ids.device_id.as_deref())
        .unwrap_or("unknown");
    let lat = event.uplink_message.decoded_payload.lat;
    let lon = event.uplink_message.decoded_payload.lon;

    info!(
        "POST /uplink-webhook - device {} at ({}, {}), {} receptions",
        device_id,
        lat,
        lon,
        event.uplink_message.rx_metadata.len()
    );

    let store = PgPointStore::new(pool);
    let outcome = match process_uplink(
        &store,
        lat,
        lon,
        &event.uplink_message.rx_metadata,
        config.excluded_gateway.as_deref(),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(e @ UplinkError::InvalidUplink(_)) => {
            error!("Rejected uplink from device {}: {}", device_id, e);
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() })))
                .into_response();
        }
        Err(e @ UplinkError::Storage(_)) => {
            error!("Failed to process uplink from device {}: {}", device_id, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "failed to persist uplink" })),
            )
                .into_response();
        }
    };

    // Best-effort acknowledgement; the response below is already decided.
    if outcome.best_measurement_id.is_some() || config.ack_on_empty {
        if let Some(notifier) = DownlinkNotifier::from_config(&config) {
            notifier.acknowledge("coverage point recorded").await;
        } else {
            debug!("Downlink acknowledgement skipped, notifier not configured");
        }
    }

    info!(
        "Uplink from device {} stored as point {} (best measurement: {:?})",
        device_id, outcome.point_id, outcome.best_measurement_id
    );

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "point_id": outcome.point_id,
            "best_measurement_id": outcome.best_measurement_id,
        })),
    )
        .into_response()
}
