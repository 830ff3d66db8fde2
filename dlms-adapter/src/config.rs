//! Adapter configuration
//!
//! Loaded from YAML. Every field has a default so an empty document is a
//! valid configuration:
//!
//! ```yaml
//! session:
//!   retries: 30
//!   sleep_between_retries_ms: 10000
//! connection:
//!   port: 4059
//!   response_timeout_ms: 300000
//!   logical_device_address: 1
//!   hls5_client_access_point: 1
//!   lls1_client_access_point: 1
//! ```

use crate::error::{AdapterError, AdapterResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

fn session_retries_default() -> u32 { 30 }
fn session_sleep_default() -> u64 { 10_000 }

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct SessionConfig {
    /// Polls of the session provider after the wake-up SMS
    #[serde(default = "session_retries_default")]
    pub retries: u32,
    #[serde(default = "session_sleep_default")]
    pub sleep_between_retries_ms: u64,
}

impl SessionConfig {
    pub fn sleep_between_retries(&self) -> Duration {
        Duration::from_millis(self.sleep_between_retries_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retries: session_retries_default(),
            sleep_between_retries_ms: session_sleep_default(),
        }
    }
}

fn connection_port_default() -> u16 { 4059 }
fn connection_response_timeout_default() -> u64 { 300_000 }
fn connection_logical_device_address_default() -> u16 { 1 }
fn connection_client_access_point_default() -> u16 { 1 }

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ConnectionConfig {
    #[serde(default = "connection_port_default")]
    pub port: u16,
    #[serde(default = "connection_response_timeout_default")]
    pub response_timeout_ms: u64,
    #[serde(default = "connection_logical_device_address_default")]
    pub logical_device_address: u16,
    #[serde(default = "connection_client_access_point_default")]
    pub hls5_client_access_point: u16,
    #[serde(default = "connection_client_access_point_default")]
    pub lls1_client_access_point: u16,
}

impl ConnectionConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port: connection_port_default(),
            response_timeout_ms: connection_response_timeout_default(),
            logical_device_address: connection_logical_device_address_default(),
            hls5_client_access_point: connection_client_access_point_default(),
            lls1_client_access_point: connection_client_access_point_default(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct AdapterConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
}

impl AdapterConfig {
    pub fn from_yaml_str(yaml: &str) -> AdapterResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yml::from_str(yaml)
            .map_err(|e| AdapterError::Configuration(format!("Invalid adapter configuration: {}", e)))
    }

    pub fn from_file(path: &Path) -> AdapterResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            AdapterError::Configuration(format!("Unable to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }
}
