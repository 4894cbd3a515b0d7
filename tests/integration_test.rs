//! End-to-end tests against a running instance of the service.
//!
//! These exercise the live HTTP surface and require a server with a reachable
//! database. Set `BASE_URL` to enable them (e.g. `http://localhost:8080`);
//! they are skipped otherwise so the unit test suite stays self-contained.

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct UplinkResponse {
    success: bool,
    point_id: Uuid,
    best_measurement_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct MapPoint {
    #[serde(rename = "COORDINATES")]
    coordinates: [f64; 2],
    #[serde(rename = "SCORE")]
    score: f64,
}

#[derive(Debug, Deserialize)]
struct MeasurementView {
    id: Uuid,
    point_id: Uuid,
    gateway_id: String,
    quality: f64,
}

fn sample_uplink(lat: f64, lon: f64) -> serde_json::Value {
    // ---
    json!({
        "end_device_ids": { "device_id": "coverage-tracker-01" },
        "uplink_message": {
            "decoded_payload": { "lat": lat, "lon": lon },
            "rx_metadata": [
                { "gateway_ids": { "gateway_id": "gw-1" }, "rssi": -98, "snr": 5 },
                { "gateway_ids": { "gateway_id": "gw-2" }, "rssi": -112, "snr": -3 }
            ]
        }
    })
}

#[tokio::test]
async fn uplink_webhook_scores_and_links_best() -> Result<()> {
    // ---
    let Ok(base) = std::env::var("BASE_URL") else {
        eprintln!("BASE_URL not set, skipping live-server test");
        return Ok(());
    };

    let client = Client::new();
    let response = client
        .post(format!("{}/uplink-webhook", base))
        .json(&sample_uplink(37.88, -4.78))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: UplinkResponse = response.json().await?;
    assert!(body.success);
    let best_id = body.best_measurement_id.expect("best measurement missing");

    // The per-point endpoint must show both gateways, best quality first.
    let url = format!("{}/api/quality-points/{}", base, body.point_id);
    let measurements: Vec<MeasurementView> = client.get(&url).send().await?.json().await?;

    assert_eq!(measurements.len(), 2);
    for m in &measurements {
        assert_eq!(m.point_id, body.point_id);
    }
    let gw1 = measurements
        .iter()
        .find(|m| m.gateway_id == "gw-1")
        .expect("gw-1 measurement missing");
    let gw2 = measurements
        .iter()
        .find(|m| m.gateway_id == "gw-2")
        .expect("gw-2 measurement missing");
    assert_eq!(gw1.quality, 100.0);
    assert_eq!(gw2.quality, 52.0);

    // The best measurement must be gw-1's persisted record.
    assert_eq!(best_id, gw1.id);
    assert_eq!(measurements[0].quality, 100.0);

    Ok(())
}

#[tokio::test]
async fn repeated_uplink_supersedes_point_at_same_coordinates() -> Result<()> {
    // ---
    let Ok(base) = std::env::var("BASE_URL") else {
        eprintln!("BASE_URL not set, skipping live-server test");
        return Ok(());
    };

    let client = Client::new();
    // Coordinates unlikely to collide with other test data
    let (lat, lon) = (37.881234, -4.784321);

    let first: UplinkResponse = client
        .post(format!("{}/uplink-webhook", base))
        .json(&sample_uplink(lat, lon))
        .send()
        .await?
        .json()
        .await?;
    let second: UplinkResponse = client
        .post(format!("{}/uplink-webhook", base))
        .json(&sample_uplink(lat, lon))
        .send()
        .await?
        .json()
        .await?;

    assert_ne!(first.point_id, second.point_id);

    // The first point was superseded; its measurements are gone.
    let url = format!("{}/api/quality-points/{}", base, first.point_id);
    let response = client.get(&url).send().await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Exactly one map entry remains for the coordinate.
    let points: Vec<MapPoint> = client
        .get(format!("{}/api/quality-points", base))
        .send()
        .await?
        .json()
        .await?;
    let at_coord: Vec<&MapPoint> = points
        .iter()
        .filter(|p| p.coordinates == [lat, lon])
        .collect();
    assert_eq!(at_coord.len(), 1);
    assert_eq!(at_coord[0].score, 100.0);

    Ok(())
}

#[tokio::test]
async fn empty_reception_list_is_a_client_error() -> Result<()> {
    // ---
    let Ok(base) = std::env::var("BASE_URL") else {
        eprintln!("BASE_URL not set, skipping live-server test");
        return Ok(());
    };

    let client = Client::new();
    let body = json!({
        "uplink_message": {
            "decoded_payload": { "lat": 37.88, "lon": -4.78 },
            "rx_metadata": []
        }
    });

    let response = client
        .post(format!("{}/uplink-webhook", base))
        .json(&body)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
