use crate::config::ConnectionConfig;
use crate::connector::{check_ip_address, connection_settings, decrypt_valid_key, DlmsConnector};
use crate::device::{Device, SecurityKeyType};
use crate::error::{AdapterError, AdapterResult};
use dlms_client::{ConnectionFactory, DlmsConnection, DlmsMessageListener};
use dlms_core::DlmsError;
use dlms_security::{EncryptionService, SecuritySuite};
use std::sync::Arc;

/// LLS1 connector (password authentication, no encryption)
pub struct Lls1Connector {
    factory: Arc<dyn ConnectionFactory>,
    encryption: Arc<EncryptionService>,
    config: ConnectionConfig,
}

impl Lls1Connector {
    pub fn new(factory: Arc<dyn ConnectionFactory>, encryption: Arc<EncryptionService>, config: ConnectionConfig) -> Self {
        Self {
            factory,
            encryption,
            config,
        }
    }
}

#[async_trait::async_trait]
impl DlmsConnector for Lls1Connector {
    async fn connect(
        &self,
        device: &mut Device,
        listener: Arc<dyn DlmsMessageListener>,
    ) -> AdapterResult<Box<dyn DlmsConnection>> {
        let ip_address = check_ip_address(device)?;
        let password = decrypt_valid_key(&self.encryption, device, SecurityKeyType::Password)?;
        let suite = SecuritySuite::lls1(password).map_err(|e| AdapterError::Configuration(e.to_string()))?;
        let settings = connection_settings(&self.config, ip_address, self.config.lls1_client_access_point, suite)?;

        self.factory.open(settings, listener).await.map_err(|e| match e {
            DlmsError::UnknownHost(host) => {
                log::warn!("The IP address is not found: {}", host);
                AdapterError::Configuration(format!("The IP address is not found: {}", host))
            }
            e => AdapterError::Connection(e.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{KeyStatus, SecurityKey};
    use crate::testing::{encryption_service, stored_key, FakeConnectionFactory, FakeMeter};
    use dlms_client::NoopMessageListener;
    use dlms_security::AuthenticationMechanism;

    fn lls1_device() -> Device {
        let mut device = Device::new("E0000000000000003");
        device.hls5_active = false;
        device.lls1_active = true;
        device.ip_address = Some("10.0.0.3".to_string());
        device.security_keys = vec![SecurityKey::new(
            SecurityKeyType::Password,
            stored_key(b"ABCDEFGH"),
            KeyStatus::Valid,
        )];
        device
    }

    #[tokio::test]
    async fn test_connect_with_decrypted_password() {
        let factory = Arc::new(FakeConnectionFactory::new(FakeMeter::shared()));
        let mut config = ConnectionConfig::default();
        config.lls1_client_access_point = 16;
        let connector = Lls1Connector::new(factory.clone(), Arc::new(encryption_service()), config);

        let mut device = lls1_device();
        connector.connect(&mut device, Arc::new(NoopMessageListener)).await.unwrap();

        let opened = factory.opened.lock().unwrap();
        assert_eq!(opened[0].client_access_point, 16);
        assert_eq!(
            opened[0].security_suite.authentication_mechanism(),
            AuthenticationMechanism::Low
        );
        assert_eq!(opened[0].security_suite, SecuritySuite::lls1(b"ABCDEFGH".to_vec()).unwrap());
    }

    #[tokio::test]
    async fn test_key_not_encrypted_with_platform_key() {
        let factory = Arc::new(FakeConnectionFactory::new(FakeMeter::shared()));
        let connector = Lls1Connector::new(factory, Arc::new(encryption_service()), ConnectionConfig::default());

        let mut device = lls1_device();
        device.security_keys[0].key = hex::encode(b"plain text password");
        let result = connector.connect(&mut device, Arc::new(NoopMessageListener)).await;
        assert!(matches!(result, Err(AdapterError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_io_failure_is_retryable() {
        let factory = Arc::new(FakeConnectionFactory::failing(|| DlmsError::Timeout));
        let connector = Lls1Connector::new(factory, Arc::new(encryption_service()), ConnectionConfig::default());

        let error = connector
            .connect(&mut lls1_device(), Arc::new(NoopMessageListener))
            .await
            .err()
            .unwrap();
        assert!(error.is_retryable());
    }
}
