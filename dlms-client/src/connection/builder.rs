//! Connection builder for DLMS/COSEM client
//!
//! The builder gathers everything needed to open a TCP logical-name
//! association with a meter; a [`ConnectionFactory`] then opens it.
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use dlms_client::ConnectionBuilder;
//! use dlms_security::SecuritySuite;
//!
//! let settings = ConnectionBuilder::new("10.0.0.17")
//!     .port(4059)
//!     .client_access_point(1)
//!     .logical_device_address(1)
//!     .security_suite(SecuritySuite::lls1(b"secret".to_vec())?)
//!     .build()?;
//! ```

use crate::connection::DlmsConnection;
use crate::listener::DlmsMessageListener;
use dlms_core::{DlmsError, DlmsResult};
use dlms_security::SecuritySuite;
use std::sync::Arc;
use std::time::Duration;

/// Everything needed to open one association
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Host name or IP address of the meter
    pub host: String,
    pub port: u16,
    /// Client service access point (wrapper source id)
    pub client_access_point: u16,
    /// Logical device address (wrapper destination id)
    pub logical_device_address: u16,
    pub response_timeout: Duration,
    pub security_suite: SecuritySuite,
}

/// Connection builder for creating DLMS/COSEM connection settings
#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    host: String,
    port: u16,
    client_access_point: u16,
    logical_device_address: u16,
    response_timeout: Duration,
    security_suite: Option<SecuritySuite>,
}

impl ConnectionBuilder {
    /// Create a new connection builder with default settings
    ///
    /// # Default Settings
    /// - Port: 4059 (IANA DLMS/COSEM TCP port)
    /// - Client access point: 0x10 (public client)
    /// - Logical device address: 0x01 (management logical device)
    /// - Response timeout: 10 seconds
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            port: 4059,
            client_access_point: 0x10,
            logical_device_address: 0x01,
            response_timeout: Duration::from_secs(10),
            security_suite: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn client_access_point(mut self, client_access_point: u16) -> Self {
        self.client_access_point = client_access_point;
        self
    }

    pub fn logical_device_address(mut self, logical_device_address: u16) -> Self {
        self.logical_device_address = logical_device_address;
        self
    }

    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn security_suite(mut self, suite: SecuritySuite) -> Self {
        self.security_suite = Some(suite);
        self
    }

    /// Validate and build the settings
    pub fn build(self) -> DlmsResult<ConnectionSettings> {
        if self.host.trim().is_empty() {
            return Err(DlmsError::InvalidData("Host must not be empty".to_string()));
        }
        let security_suite = self
            .security_suite
            .ok_or_else(|| DlmsError::Security("No security suite configured".to_string()))?;
        Ok(ConnectionSettings {
            host: self.host,
            port: self.port,
            client_access_point: self.client_access_point,
            logical_device_address: self.logical_device_address,
            response_timeout: self.response_timeout,
            security_suite,
        })
    }
}

/// Opens associations with meters
///
/// Implementations resolve the host, open the transport and perform the
/// association handshake for the configured security suite. An unresolvable
/// host must be reported as [`DlmsError::UnknownHost`] so callers can tell it
/// apart from transient I/O failures.
#[async_trait::async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn open(
        &self,
        settings: ConnectionSettings,
        listener: Arc<dyn DlmsMessageListener>,
    ) -> DlmsResult<Box<dyn DlmsConnection>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let settings = ConnectionBuilder::new("10.0.0.1")
            .security_suite(SecuritySuite::lls1(b"pw".to_vec()).unwrap())
            .build()
            .unwrap();
        assert_eq!(settings.port, 4059);
        assert_eq!(settings.client_access_point, 0x10);
        assert_eq!(settings.logical_device_address, 0x01);
    }

    #[test]
    fn test_builder_requires_suite_and_host() {
        assert!(ConnectionBuilder::new("10.0.0.1").build().is_err());
        let suite = SecuritySuite::lls1(b"pw".to_vec()).unwrap();
        assert!(ConnectionBuilder::new(" ").security_suite(suite).build().is_err());
    }
}
