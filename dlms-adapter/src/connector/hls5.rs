use crate::config::ConnectionConfig;
use crate::connector::{
    check_ip_address, connection_settings, decrypt_valid_key, DlmsConnector, RecoverKeyProcessInitiator,
};
use crate::device::{Device, SecurityKeyType};
use crate::error::{AdapterError, AdapterResult};
use crate::repository::DeviceRepository;
use dlms_client::{ConnectionFactory, DlmsConnection, DlmsMessageListener};
use dlms_core::DlmsError;
use dlms_security::{EncryptionService, SecuritySuite};
use std::sync::Arc;

/// HLS5 connector (GMAC authentication, authenticated encryption)
pub struct Hls5Connector {
    factory: Arc<dyn ConnectionFactory>,
    repository: Arc<dyn DeviceRepository>,
    encryption: Arc<EncryptionService>,
    recover_key_process_initiator: Arc<dyn RecoverKeyProcessInitiator>,
    config: ConnectionConfig,
}

impl Hls5Connector {
    pub fn new(
        factory: Arc<dyn ConnectionFactory>,
        repository: Arc<dyn DeviceRepository>,
        encryption: Arc<EncryptionService>,
        recover_key_process_initiator: Arc<dyn RecoverKeyProcessInitiator>,
        config: ConnectionConfig,
    ) -> Self {
        Self {
            factory,
            repository,
            encryption,
            recover_key_process_initiator,
            config,
        }
    }

    fn security_suite(&self, device: &Device) -> AdapterResult<SecuritySuite> {
        let authentication_key =
            decrypt_valid_key(&self.encryption, device, SecurityKeyType::EMeterAuthentication)?;
        let encryption_key = decrypt_valid_key(&self.encryption, device, SecurityKeyType::EMeterEncryption)?;
        SecuritySuite::hls5(authentication_key, encryption_key, device.challenge_length)
            .map_err(|e| AdapterError::Configuration(e.to_string()))
    }

    /// Drop keys left behind by earlier key changes, now that the valid keys
    /// are known to work
    async fn discard_invalid_keys(&self, device: &mut Device) -> AdapterResult<()> {
        let before = device.security_keys.len();
        device.discard_invalid_keys();
        if device.security_keys.len() != before {
            *device = self.repository.save_device(device).await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DlmsConnector for Hls5Connector {
    async fn connect(
        &self,
        device: &mut Device,
        listener: Arc<dyn DlmsMessageListener>,
    ) -> AdapterResult<Box<dyn DlmsConnection>> {
        let ip_address = check_ip_address(device)?.to_string();
        let suite = self.security_suite(device)?;
        let settings = connection_settings(&self.config, &ip_address, self.config.hls5_client_access_point, suite)?;

        let mut connection = match self.factory.open(settings, listener).await {
            Ok(connection) => connection,
            Err(DlmsError::UnknownHost(host)) => {
                log::warn!("The IP address is not found: {}", host);
                return Err(AdapterError::Configuration(format!(
                    "The IP address is not found: {}",
                    host
                )));
            }
            Err(e) => {
                if device.has_new_security_key() {
                    log::warn!(
                        "Connection to device {} failed with a pending key, initiating key recovery",
                        device.device_identification
                    );
                    self.recover_key_process_initiator
                        .initiate(&device.device_identification, &ip_address);
                }
                return Err(AdapterError::Connection(e.to_string()));
            }
        };

        if let Err(e) = self.discard_invalid_keys(device).await {
            if let Err(close_error) = connection.close().await {
                log::warn!(
                    "Failed to close connection to device {}: {}",
                    device.device_identification,
                    close_error
                );
            }
            return Err(e);
        }
        Ok(connection)
    }
}
