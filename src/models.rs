//! Data models and the signal-quality scoring logic for the coverage pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// ---

/// Gateway identifier used when a reception entry carries none.
pub const UNKNOWN_GATEWAY: &str = "unknown";

/// RSSI substituted when a reception entry has a missing or non-numeric value.
pub const DEFAULT_RSSI: f64 = -120.0;

/// SNR substituted when a reception entry has a missing or non-numeric value.
pub const DEFAULT_SNR: f64 = -10.0;

// ---

/// One per-gateway reception entry from the network server's `rx_metadata` array.
///
/// Network servers are inconsistent about these fields, so everything is
/// optional and non-numeric values are tolerated; defaults are applied in
/// [`RawReception::to_measurement`].
#[derive(Debug, Deserialize)]
pub struct RawReception {
    // ---
    #[serde(default)]
    pub gateway_ids: Option<GatewayIds>,
    #[serde(default, deserialize_with = "numeric_or_none")]
    pub rssi: Option<f64>,
    #[serde(default, deserialize_with = "numeric_or_none")]
    pub snr: Option<f64>,
}

/// Nested gateway identifier block (TTN v3 shape).
#[derive(Debug, Deserialize)]
pub struct GatewayIds {
    #[serde(default)]
    pub gateway_id: Option<String>,
}

/// A persisted geographic point, one per uplink event.
///
/// `best_quality` holds the id of this point's highest-scoring measurement,
/// or `NULL` until one has been linked.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GeoPoint {
    // ---
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub best_quality: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A scored reception measurement owned by one [`GeoPoint`].
///
/// Immutable after insertion; removed only when its owning point is
/// superseded by a newer uplink at the same coordinates.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Measurement {
    // ---
    pub id: Uuid,
    pub point_id: Uuid,
    pub gateway_id: String,
    pub rssi: f64,
    pub snr: f64,
    pub quality: f64,
    pub created_at: DateTime<Utc>,
}

// ---

impl GeoPoint {
    /// Create a fresh point at the given coordinates, best measurement unset.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        // ---
        GeoPoint {
            id: Uuid::new_v4(),
            latitude,
            longitude,
            best_quality: None,
            created_at: Utc::now(),
        }
    }
}

impl RawReception {
    /// Normalize this reception into an unsaved [`Measurement`] owned by `point_id`.
    ///
    /// Applies the sentinel gateway id and the RSSI/SNR defaults, then derives
    /// the quality score via [`quality_score`].
    pub fn to_measurement(&self, point_id: Uuid) -> Measurement {
        // ---
        let gateway_id = self
            .gateway_ids
            .as_ref()
            .and_then(|g| g.gateway_id.clone())
            .unwrap_or_else(|| UNKNOWN_GATEWAY.to_string());
        let rssi = self.rssi.unwrap_or(DEFAULT_RSSI);
        let snr = self.snr.unwrap_or(DEFAULT_SNR);

        Measurement {
            id: Uuid::new_v4(),
            point_id,
            gateway_id,
            rssi,
            snr,
            quality: quality_score(rssi),
            created_at: Utc::now(),
        }
    }

    fn gateway_matches(&self, excluded: &str) -> bool {
        // ---
        self.gateway_ids
            .as_ref()
            .and_then(|g| g.gateway_id.as_deref())
            .map_or(false, |id| id == excluded)
    }
}

// ---

/// Derive a signal-quality score in `[0, 100]` from RSSI in dBm.
///
/// Piecewise-linear over five 5 dBm bands, each worth 20 points, saturating
/// at 100 above -100 dBm and at 0 at or below -120 dBm. Continuous and
/// non-decreasing across the whole domain. Rounded to 2 decimal places.
pub fn quality_score(rssi: f64) -> f64 {
    // ---
    let quality = if rssi > -100.0 {
        100.0
    } else if rssi > -105.0 {
        80.0 + ((rssi + 105.0) / 5.0) * 20.0
    } else if rssi > -110.0 {
        60.0 + ((rssi + 110.0) / 5.0) * 20.0
    } else if rssi > -115.0 {
        40.0 + ((rssi + 115.0) / 5.0) * 20.0
    } else if rssi > -120.0 {
        20.0 + ((rssi + 120.0) / 5.0) * 20.0
    } else {
        0.0
    };

    (quality * 100.0).round() / 100.0
}

/// Normalize a batch of raw receptions into measurements for `point_id`.
///
/// Entries whose gateway id equals `excluded_gateway` (a configured self-test
/// gateway) are dropped before scoring; the result may therefore be empty
/// even when the input is not.
pub fn build_measurements(
    receptions: &[RawReception],
    point_id: Uuid,
    excluded_gateway: Option<&str>,
) -> Vec<Measurement> {
    // ---
    receptions
        .iter()
        .filter(|r| excluded_gateway.map_or(true, |ex| !r.gateway_matches(ex)))
        .map(|r| r.to_measurement(point_id))
        .collect()
}

/// Select the measurement with the greatest quality score.
///
/// Stable left-to-right scan: on ties the first-encountered maximum wins.
/// Returns `None` for an empty slice; the caller decides what an empty batch
/// means (the coordinator reports success with no best measurement).
pub fn best_measurement(measurements: &[Measurement]) -> Option<&Measurement> {
    // ---
    let mut best = measurements.first()?;
    for m in &measurements[1..] {
        if m.quality > best.quality {
            best = m;
        }
    }
    Some(best)
}

// ---

/// Accept any JSON value but only keep actual numbers, so a string `"rssi"`
/// from a misbehaving gateway degrades to the default instead of failing the
/// whole uplink.
fn numeric_or_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    // ---
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn reception(gateway: Option<&str>, rssi: Option<f64>, snr: Option<f64>) -> RawReception {
        // ---
        RawReception {
            gateway_ids: gateway.map(|id| GatewayIds {
                gateway_id: Some(id.to_string()),
            }),
            rssi,
            snr,
        }
    }

    fn measurement_with_quality(quality: f64) -> Measurement {
        // ---
        Measurement {
            id: Uuid::new_v4(),
            point_id: Uuid::new_v4(),
            gateway_id: "gw-test".to_string(),
            rssi: -100.0,
            snr: 0.0,
            quality,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_quality_saturates_high() {
        // ---
        assert_eq!(quality_score(-99.9), 100.0);
        assert_eq!(quality_score(-50.0), 100.0);
        assert_eq!(quality_score(0.0), 100.0);
    }

    #[test]
    fn test_quality_saturates_low() {
        // ---
        assert_eq!(quality_score(-120.0), 0.0);
        assert_eq!(quality_score(-130.0), 0.0);
        assert_eq!(quality_score(-200.0), 0.0);
    }

    #[test]
    fn test_quality_band_boundaries() {
        // ---
        // Each boundary belongs to the band below it, and adjacent bands meet
        // at the same value, so the mapping is continuous.
        assert_eq!(quality_score(-105.0), 80.0);
        assert_eq!(quality_score(-110.0), 60.0);
        assert_eq!(quality_score(-115.0), 40.0);
        assert_eq!(quality_score(-102.5), 90.0);
        assert_eq!(quality_score(-112.0), 52.0);
        assert_eq!(quality_score(-119.0), 24.0);
    }

    #[test]
    fn test_quality_is_monotone() {
        // ---
        // Sweep the domain in 0.1 dBm steps; the score must never decrease.
        let mut prev = quality_score(-130.0);
        let mut rssi = -130.0;
        while rssi <= -90.0 {
            let q = quality_score(rssi);
            assert!(
                q >= prev,
                "score decreased at rssi={}: {} < {}",
                rssi,
                q,
                prev
            );
            prev = q;
            rssi += 0.1;
        }
    }

    #[test]
    fn test_quality_rounding() {
        // ---
        // -101.3 dBm → 80 + (3.7/5)*20 = 94.8 exactly after rounding.
        assert_eq!(quality_score(-101.3), 94.8);
    }

    #[test]
    fn test_reception_defaults() {
        // ---
        let point_id = Uuid::new_v4();
        let bare = reception(None, None, None);
        let m = bare.to_measurement(point_id);

        assert_eq!(m.gateway_id, UNKNOWN_GATEWAY);
        assert_eq!(m.rssi, DEFAULT_RSSI);
        assert_eq!(m.snr, DEFAULT_SNR);
        assert_eq!(m.quality, 0.0);
        assert_eq!(m.point_id, point_id);
    }

    #[test]
    fn test_non_numeric_rssi_degrades_to_default() {
        // ---
        let raw: RawReception = serde_json::from_value(serde_json::json!({
            "gateway_ids": { "gateway_id": "gw-1" },
            "rssi": "strong",
            "snr": 7.25
        }))
        .unwrap();

        let m = raw.to_measurement(Uuid::new_v4());
        assert_eq!(m.rssi, DEFAULT_RSSI);
        assert_eq!(m.snr, 7.25);
    }

    #[test]
    fn test_build_measurements_excludes_self_test_gateway() {
        // ---
        let point_id = Uuid::new_v4();
        let receptions = vec![
            reception(Some("gw-field"), Some(-98.0), Some(5.0)),
            reception(Some("gw-selftest"), Some(-70.0), Some(10.0)),
        ];

        let measurements = build_measurements(&receptions, point_id, Some("gw-selftest"));
        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].gateway_id, "gw-field");

        // Exclusion can empty the batch entirely.
        let only_self = vec![reception(Some("gw-selftest"), Some(-70.0), Some(10.0))];
        assert!(build_measurements(&only_self, point_id, Some("gw-selftest")).is_empty());

        // No exclusion configured keeps everything.
        let all = build_measurements(&receptions, point_id, None);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_best_measurement_keeps_first_maximum() {
        // ---
        let measurements: Vec<Measurement> = [40.0, 95.5, 95.5, 10.0]
            .iter()
            .map(|&q| measurement_with_quality(q))
            .collect();

        let best = best_measurement(&measurements).unwrap();
        assert_eq!(best.quality, 95.5);
        assert_eq!(best.id, measurements[1].id);
    }

    #[test]
    fn test_best_measurement_empty_is_none() {
        // ---
        assert!(best_measurement(&[]).is_none());
    }
}
