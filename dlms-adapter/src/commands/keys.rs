//! Security key replacement
//!
//! Keys are replaced one at a time over a single association, always the
//! authentication key first and then the encryption key. For each key:
//!
//! 1. the new key is stored on the device record as pending
//! 2. the meter receives it through the Security Setup `key_transfer`
//!    method, wrapped with the master key
//! 3. the association switches its own security context to the new key
//! 4. the pending key becomes valid and the key it replaces invalid
//!
//! A failing step stops the replacement. Keys that already went through all
//! four steps stay valid; the key that failed stays pending so that key
//! recovery can find it.

use crate::commands::{bundle_type_mismatch, BundleAction, CommandExecutor};
use crate::connector::decrypt_valid_key;
use crate::device::{Device, SecurityKeyType};
use crate::error::{AdapterError, AdapterResult};
use crate::holder::ConnectionHolder;
use crate::repository::DeviceRepository;
use dlms_client::MethodParameter;
use dlms_core::{DataObject, ObisCode};
use dlms_security::{generate_aes128_key, wrap_key, EncryptionService, KeyId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const CLASS_ID_SECURITY_SETUP: u16 = 64;
const OBIS_CODE_SECURITY_SETUP: ObisCode = ObisCode::new(0, 0, 43, 0, 0, 255);
const METHOD_ID_KEY_TRANSFER: i8 = 2;

/// New keys, each the hex encoding of platform-encrypted key material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
    pub authentication_key: String,
    pub encryption_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyChangeResult {
    pub device_identification: String,
    /// Key types now valid on the device, in the order they were replaced
    pub replaced: Vec<SecurityKeyType>,
}

/// Replaces the authentication and encryption keys of an E-meter
pub struct ReplaceKeysExecutor {
    repository: Arc<dyn DeviceRepository>,
    encryption: Arc<EncryptionService>,
}

impl ReplaceKeysExecutor {
    pub fn new(repository: Arc<dyn DeviceRepository>, encryption: Arc<EncryptionService>) -> Self {
        Self { repository, encryption }
    }

    async fn replace_key(
        &self,
        holder: &mut ConnectionHolder,
        device: &mut Device,
        key_type: SecurityKeyType,
        stored_key: &str,
    ) -> AdapterResult<()> {
        let key = self.decrypt_new_key(device, key_type, stored_key)?;

        device.add_pending_key(key_type, stored_key);
        *device = self.repository.save_device(device).await?;

        self.transfer_key(holder, device, key_type, &key).await?;
        self.update_association(holder, device, key_type, &key).await?;

        device.promote_pending_key(key_type)?;
        *device = self.repository.save_device(device).await?;
        log::info!(
            "Replaced {} key of device {}",
            key_type,
            device.device_identification
        );
        Ok(())
    }

    fn decrypt_new_key(&self, device: &Device, key_type: SecurityKeyType, stored_key: &str) -> AdapterResult<Vec<u8>> {
        let encrypted = hex::decode(stored_key).map_err(|e| {
            AdapterError::Configuration(format!("New {} key is not hex encoded: {}", key_type, e))
        })?;
        self.encryption.decrypt(&encrypted).map_err(|e| {
            log::error!(
                "Decryption of new {} key failed for device {}: {}",
                key_type,
                device.device_identification,
                e
            );
            AdapterError::Configuration(format!(
                "Decryption of new {} key failed for device: {}",
                key_type, device.device_identification
            ))
        })
    }

    async fn transfer_key(
        &self,
        holder: &mut ConnectionHolder,
        device: &Device,
        key_type: SecurityKeyType,
        key: &[u8],
    ) -> AdapterResult<()> {
        let master_key = decrypt_valid_key(&self.encryption, device, SecurityKeyType::EMeterMaster)?;
        let wrapped_key = wrap_key(&master_key, key)
            .map_err(|e| AdapterError::ProtocolAdapter(format!("Unable to wrap {} key: {}", key_type, e)))?;
        let key_id = match key_type {
            SecurityKeyType::EMeterAuthentication => KeyId::AuthenticationKey,
            _ => KeyId::GlobalUnicastEncryptionKey,
        };
        let key_data = DataObject::Array(vec![DataObject::Structure(vec![
            DataObject::Enumerate(key_id.id()),
            DataObject::OctetString(wrapped_key),
        ])]);
        let parameter = MethodParameter::new(
            CLASS_ID_SECURITY_SETUP,
            OBIS_CODE_SECURITY_SETUP,
            METHOD_ID_KEY_TRANSFER,
            Some(key_data),
        );

        holder.describe(&format!("ReplaceKeys {}, call key_transfer on {}", key_type, OBIS_CODE_SECURITY_SETUP));
        let result = holder
            .get()?
            .action(parameter)
            .await
            .map_err(|e| AdapterError::ProtocolAdapter(format!("Unexpected exception during key_transfer: {}", e)))?;
        if !result.result_code.is_success() {
            return Err(AdapterError::ProtocolAdapter(format!(
                "key_transfer of {} key failed with result {:?}",
                key_type, result.result_code
            )));
        }
        Ok(())
    }

    async fn update_association(
        &self,
        holder: &mut ConnectionHolder,
        device: &Device,
        key_type: SecurityKeyType,
        key: &[u8],
    ) -> AdapterResult<()> {
        let connection = holder.get()?;
        let changed = match key_type {
            SecurityKeyType::EMeterAuthentication => connection.change_client_global_authentication_key(key).await,
            _ => connection.change_client_global_encryption_key(key).await,
        };
        changed.map_err(|e| {
            AdapterError::ProtocolAdapter(format!(
                "Unable to switch the {} key of the association with device {}: {}",
                key_type, device.device_identification, e
            ))
        })
    }
}

#[async_trait::async_trait]
impl CommandExecutor for ReplaceKeysExecutor {
    type Request = KeySet;
    type Response = KeyChangeResult;

    async fn execute(
        &self,
        holder: &mut ConnectionHolder,
        device: &mut Device,
        request: KeySet,
    ) -> AdapterResult<KeyChangeResult> {
        log::info!("Replacing keys of device {}", device.device_identification);
        let steps = [
            (SecurityKeyType::EMeterAuthentication, request.authentication_key.as_str()),
            (SecurityKeyType::EMeterEncryption, request.encryption_key.as_str()),
        ];
        let mut replaced = Vec::with_capacity(steps.len());
        for (key_type, stored_key) in steps {
            self.replace_key(holder, device, key_type, stored_key).await?;
            replaced.push(key_type);
        }
        Ok(KeyChangeResult {
            device_identification: device.device_identification.clone(),
            replaced,
        })
    }

    fn from_bundle_input(&self, action: BundleAction) -> AdapterResult<KeySet> {
        match action {
            BundleAction::ReplaceKeys(keys) => Ok(keys),
            other => Err(bundle_type_mismatch("ReplaceKeys", &other)),
        }
    }
}

/// Generates a fresh key pair and replaces the current keys with it
pub struct GenerateAndReplaceKeysExecutor {
    replace_keys: ReplaceKeysExecutor,
    encryption: Arc<EncryptionService>,
}

impl GenerateAndReplaceKeysExecutor {
    pub fn new(repository: Arc<dyn DeviceRepository>, encryption: Arc<EncryptionService>) -> Self {
        Self {
            replace_keys: ReplaceKeysExecutor::new(repository, encryption.clone()),
            encryption,
        }
    }

    fn generate_stored_key(&self) -> AdapterResult<String> {
        let key = generate_aes128_key().map_err(|e| AdapterError::Configuration(e.to_string()))?;
        let encrypted = self
            .encryption
            .encrypt(&key)
            .map_err(|e| AdapterError::Configuration(format!("Unable to encrypt generated key: {}", e)))?;
        Ok(hex::encode(encrypted))
    }
}

#[async_trait::async_trait]
impl CommandExecutor for GenerateAndReplaceKeysExecutor {
    type Request = ();
    type Response = KeyChangeResult;

    async fn execute(
        &self,
        holder: &mut ConnectionHolder,
        device: &mut Device,
        _request: (),
    ) -> AdapterResult<KeyChangeResult> {
        log::info!("Generating new keys for device {}", device.device_identification);
        let keys = KeySet {
            authentication_key: self.generate_stored_key()?,
            encryption_key: self.generate_stored_key()?,
        };
        self.replace_keys.execute(holder, device, keys).await
    }

    fn from_bundle_input(&self, action: BundleAction) -> AdapterResult<()> {
        match action {
            BundleAction::GenerateAndReplaceKeys => Ok(()),
            other => Err(bundle_type_mismatch("GenerateAndReplaceKeys", &other)),
        }
    }
}
