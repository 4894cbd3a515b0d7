//! Configuration loader for the `lora-coverage-map` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.

use std::env;

use anyhow::{anyhow, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse an optional boolean environment variable ("1"/"true"/"yes" is true).
macro_rules! parse_env_bool {
    ($var_name:expr, $default:expr) => {
        match env::var($var_name).ok().as_deref() {
            Some("1") | Some("true") | Some("yes") => true,
            Some("0") | Some("false") | Some("no") => false,
            Some(other) => return Err(anyhow!("Invalid {}: {}", $var_name, other)),
            None => $default,
        }
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Network-server downlink push endpoint; downlink acknowledgements are
    /// disabled when unset.
    pub downlink_url: Option<String>,

    /// Bearer credential for the downlink endpoint.
    pub downlink_api_key: Option<String>,

    /// Application port (f_port) stamped on outbound downlinks.
    pub downlink_fport: u32,

    /// Priority marker stamped on outbound downlinks.
    pub downlink_priority: String,

    /// Send the acknowledgement even when no measurement qualified.
    pub ack_on_empty: bool,

    /// Self-test gateway excluded from scoring; no exclusion when unset.
    pub excluded_gateway: Option<String>,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `DOWNLINK_API_URL` – downlink push endpoint (acks disabled when unset)
/// - `DOWNLINK_API_KEY` – bearer credential for that endpoint
/// - `DOWNLINK_FPORT` – downlink application port (default: 1)
/// - `DOWNLINK_PRIORITY` – downlink priority marker (default: NORMAL)
/// - `ACK_ON_EMPTY` – acknowledge uplinks with no qualifying measurement (default: false)
/// - `EXCLUDED_GATEWAY_ID` – self-test gateway to drop from scoring
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let db_pool_max = parse_env_u32!("DB_POOL_MAX", 5);
    let downlink_url = env::var("DOWNLINK_API_URL").ok();
    let downlink_api_key = env::var("DOWNLINK_API_KEY").ok();
    let downlink_fport = parse_env_u32!("DOWNLINK_FPORT", 1);
    let downlink_priority =
        env::var("DOWNLINK_PRIORITY").unwrap_or_else(|_| "NORMAL".to_string());
    let ack_on_empty = parse_env_bool!("ACK_ON_EMPTY", false);
    let excluded_gateway = env::var("EXCLUDED_GATEWAY_ID").ok();

    Ok(Config {
        db_url,
        db_pool_max,
        downlink_url,
        downlink_api_key,
        downlink_fport,
        downlink_priority,
        ack_on_empty,
        excluded_gateway,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information like database passwords and the downlink
    /// credential while showing all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        // Mask the password in the database URL for security
        let masked_db_url = if let Some(at_pos) = self.db_url.rfind('@') {
            if let Some(colon_pos) = self.db_url[..at_pos].rfind(':') {
                format!(
                    "{}:****{}",
                    &self.db_url[..colon_pos],
                    &self.db_url[at_pos..]
                )
            } else {
                self.db_url.clone()
            }
        } else {
            self.db_url.clone()
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL        : {}", masked_db_url);
        tracing::info!("  DB_POOL_MAX         : {}", self.db_pool_max);
        tracing::info!(
            "  DOWNLINK_API_URL    : {}",
            self.downlink_url.as_deref().unwrap_or("(unset, acks disabled)")
        );
        tracing::info!(
            "  DOWNLINK_API_KEY    : {}",
            if self.downlink_api_key.is_some() {
                "****"
            } else {
                "(unset)"
            }
        );
        tracing::info!("  DOWNLINK_FPORT      : {}", self.downlink_fport);
        tracing::info!("  DOWNLINK_PRIORITY   : {}", self.downlink_priority);
        tracing::info!("  ACK_ON_EMPTY        : {}", self.ack_on_empty);
        tracing::info!(
            "  EXCLUDED_GATEWAY_ID : {}",
            self.excluded_gateway.as_deref().unwrap_or("(none)")
        );
    }
}
