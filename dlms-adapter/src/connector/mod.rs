//! Connectors open a secured association with a device
//!
//! Which connector is used depends on the security suite the device is
//! configured for:
//!
//! - [`Hls5Connector`]: HLS5 GMAC mutual authentication with authenticated
//!   and encrypted payloads, using the device's valid authentication and
//!   encryption keys
//! - [`Lls1Connector`]: low level security with the device's password
//!
//! An unknown host is a configuration error. Every other failure to open the
//! transport is a retryable connection error.

pub mod hls5;
pub mod lls1;

pub use hls5::Hls5Connector;
pub use lls1::Lls1Connector;

use crate::config::ConnectionConfig;
use crate::device::{Device, SecurityKey, SecurityKeyType};
use crate::error::{AdapterError, AdapterResult};
use dlms_client::{ConnectionBuilder, ConnectionSettings, DlmsConnection, DlmsMessageListener};
use dlms_security::{EncryptionService, SecuritySuite};
use std::sync::Arc;

#[async_trait::async_trait]
pub trait DlmsConnector: Send + Sync {
    /// Open a connection to `device`
    ///
    /// The connector may update the device record (and persist it), so the
    /// caller's copy is passed mutably.
    async fn connect(
        &self,
        device: &mut Device,
        listener: Arc<dyn DlmsMessageListener>,
    ) -> AdapterResult<Box<dyn DlmsConnection>>;
}

/// Starts the out-of-band key recovery for a device that may have accepted
/// a key the adapter never confirmed
#[cfg_attr(test, mockall::automock)]
pub trait RecoverKeyProcessInitiator: Send + Sync {
    fn initiate(&self, device_identification: &str, ip_address: &str);
}

/// The connectors of one adapter, selected per device
#[derive(Clone)]
pub struct Connectors {
    hls5: Arc<Hls5Connector>,
    lls1: Arc<Lls1Connector>,
}

impl Connectors {
    pub fn new(hls5: Arc<Hls5Connector>, lls1: Arc<Lls1Connector>) -> Self {
        Self { hls5, lls1 }
    }

    pub fn for_device(&self, device: &Device) -> AdapterResult<Arc<dyn DlmsConnector>> {
        if device.hls5_active {
            Ok(self.hls5.clone())
        } else if device.lls1_active {
            Ok(self.lls1.clone())
        } else {
            Err(AdapterError::Configuration(format!(
                "No supported security suite active for device {}",
                device.device_identification
            )))
        }
    }
}

fn check_ip_address(device: &Device) -> AdapterResult<&str> {
    device.ip_address.as_deref().ok_or_else(|| {
        AdapterError::Configuration(format!(
            "Unable to connect to device {}, because the IP address is not set",
            device.device_identification
        ))
    })
}

fn valid_key(device: &Device, key_type: SecurityKeyType) -> AdapterResult<&SecurityKey> {
    device.valid_security_key(key_type).ok_or_else(|| {
        AdapterError::Configuration(format!(
            "There is no valid key for device '{}' of type '{}'",
            device.device_identification, key_type
        ))
    })
}

/// Plain key material of the valid key of `key_type`
pub(crate) fn decrypt_valid_key(
    encryption: &EncryptionService,
    device: &Device,
    key_type: SecurityKeyType,
) -> AdapterResult<Vec<u8>> {
    let encrypted = valid_key(device, key_type)?.encrypted_bytes()?;
    encryption.decrypt(&encrypted).map_err(|e| {
        log::error!(
            "Decryption of security keys failed for device {}: {}",
            device.device_identification,
            e
        );
        AdapterError::Configuration(format!(
            "Decryption of security keys failed for device: {}",
            device.device_identification
        ))
    })
}

fn connection_settings(
    config: &ConnectionConfig,
    host: &str,
    client_access_point: u16,
    security_suite: SecuritySuite,
) -> AdapterResult<ConnectionSettings> {
    ConnectionBuilder::new(host)
        .port(config.port)
        .client_access_point(client_access_point)
        .logical_device_address(config.logical_device_address)
        .response_timeout(config.response_timeout())
        .security_suite(security_suite)
        .build()
        .map_err(|e| AdapterError::Configuration(e.to_string()))
}
