//! Best-effort downlink acknowledgements back to the originating device.
//!
//! The notifier pushes a device-addressed downlink through the network
//! server's HTTP API. Dispatch is fire-and-forget: any failure is logged and
//! never surfaces to the uplink webhook response.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{debug, warn};

use crate::Config;

// ---

/// Client for the network server's downlink push endpoint.
///
/// Built once at startup from [`Config`]; the bearer credential and endpoint
/// are never read from the environment at dispatch time.
pub struct DownlinkNotifier {
    // ---
    client: reqwest::Client,
    url: String,
    api_key: String,
    fport: u32,
    priority: String,
}

impl DownlinkNotifier {
    /// Build a notifier if the downlink endpoint and credential are both
    /// configured; otherwise acknowledgements are disabled.
    pub fn from_config(config: &Config) -> Option<Self> {
        // ---
        let url = config.downlink_url.clone()?;
        let api_key = config.downlink_api_key.clone()?;

        Some(DownlinkNotifier {
            client: reqwest::Client::new(),
            url,
            api_key,
            fport: config.downlink_fport,
            priority: config.downlink_priority.clone(),
        })
    }

    /// Dispatch a plaintext acknowledgement as a downlink.
    ///
    /// Single attempt, no retries. Errors are logged at `warn` and swallowed.
    pub async fn acknowledge(&self, message: &str) {
        // ---
        let body = self.request_body(message);

        let result = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Downlink acknowledgement dispatched");
            }
            Ok(response) => {
                warn!(
                    "Downlink endpoint rejected acknowledgement: {}",
                    response.status()
                );
            }
            Err(e) => {
                warn!("Failed to dispatch downlink acknowledgement: {}", e);
            }
        }
    }

    /// Downlink push body: base64 payload, fixed application port, priority.
    fn request_body(&self, message: &str) -> serde_json::Value {
        // ---
        serde_json::json!({
            "downlinks": [{
                "frm_payload": BASE64.encode(message.as_bytes()),
                "f_port": self.fport,
                "priority": self.priority,
            }]
        })
    }
}
