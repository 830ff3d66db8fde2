//! Device record and its security keys
//!
//! A [`Device`] is read from the repository before every command and written
//! back after key changes. Key material is stored as the hex encoding of the
//! platform-encrypted bytes, never in plain text.

pub mod mbus;

pub use mbus::{IdentificationNumber, ManufacturerId};

use crate::error::{AdapterError, AdapterResult};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityKeyType {
    EMeterAuthentication,
    EMeterEncryption,
    EMeterMaster,
    Password,
    GMeterEncryption,
    GMeterMaster,
}

impl fmt::Display for SecurityKeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SecurityKeyType::EMeterAuthentication => "E_METER_AUTHENTICATION",
            SecurityKeyType::EMeterEncryption => "E_METER_ENCRYPTION",
            SecurityKeyType::EMeterMaster => "E_METER_MASTER",
            SecurityKeyType::Password => "PASSWORD",
            SecurityKeyType::GMeterEncryption => "G_METER_ENCRYPTION",
            SecurityKeyType::GMeterMaster => "G_METER_MASTER",
        };
        write!(f, "{}", name)
    }
}

/// Validity of a stored key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyStatus {
    /// In use on the device
    Valid,
    /// Generated or sent, device acceptance not yet confirmed
    Pending,
    /// Superseded
    Invalid,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityKey {
    pub key_type: SecurityKeyType,
    /// Hex of the platform-encrypted key material
    pub key: String,
    pub status: KeyStatus,
}

impl SecurityKey {
    pub fn new(key_type: SecurityKeyType, key: impl Into<String>, status: KeyStatus) -> Self {
        Self {
            key_type,
            key: key.into(),
            status,
        }
    }

    /// Encrypted key material as bytes
    pub fn encrypted_bytes(&self) -> AdapterResult<Vec<u8>> {
        hex::decode(&self.key).map_err(|e| {
            AdapterError::Configuration(format!("Key of type {} is not valid hex: {}", self.key_type, e))
        })
    }
}

impl fmt::Debug for SecurityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityKey")
            .field("key_type", &self.key_type)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub device_identification: String,
    /// Subscriber id of the SIM, used by session providers and wake-up SMS
    pub iccid: String,
    pub ip_address: Option<String>,
    pub ip_address_is_static: bool,
    pub communication_provider: String,
    pub selective_access_supported: bool,
    pub challenge_length: Option<u32>,
    pub in_debug_mode: bool,
    pub hls5_active: bool,
    pub lls1_active: bool,
    /// Bumped by the repository on every save
    pub version: u64,
    pub security_keys: Vec<SecurityKey>,
}

impl Device {
    pub fn new(device_identification: impl Into<String>) -> Self {
        Self {
            device_identification: device_identification.into(),
            iccid: String::new(),
            ip_address: None,
            ip_address_is_static: true,
            communication_provider: String::new(),
            selective_access_supported: false,
            challenge_length: None,
            in_debug_mode: false,
            hls5_active: true,
            lls1_active: false,
            version: 0,
            security_keys: Vec::new(),
        }
    }

    pub fn valid_security_key(&self, key_type: SecurityKeyType) -> Option<&SecurityKey> {
        self.security_keys
            .iter()
            .find(|key| key.key_type == key_type && key.status == KeyStatus::Valid)
    }

    pub fn pending_security_key(&self, key_type: SecurityKeyType) -> Option<&SecurityKey> {
        self.security_keys
            .iter()
            .find(|key| key.key_type == key_type && key.status == KeyStatus::Pending)
    }

    /// Whether a key change was started but never confirmed
    pub fn has_new_security_key(&self) -> bool {
        self.security_keys.iter().any(|key| key.status == KeyStatus::Pending)
    }

    pub fn discard_invalid_keys(&mut self) {
        self.security_keys.retain(|key| key.status != KeyStatus::Invalid);
    }

    /// Store `key` as the pending key of its type, replacing an older pending one
    pub fn add_pending_key(&mut self, key_type: SecurityKeyType, key: impl Into<String>) {
        self.security_keys
            .retain(|existing| !(existing.key_type == key_type && existing.status == KeyStatus::Pending));
        self.security_keys
            .push(SecurityKey::new(key_type, key, KeyStatus::Pending));
    }

    /// Make the pending key of `key_type` the valid one
    ///
    /// The previously valid key of that type becomes invalid, so there is
    /// never more than one valid key per type.
    pub fn promote_pending_key(&mut self, key_type: SecurityKeyType) -> AdapterResult<()> {
        let pending = self
            .security_keys
            .iter()
            .position(|key| key.key_type == key_type && key.status == KeyStatus::Pending)
            .ok_or_else(|| {
                AdapterError::ProtocolAdapter(format!(
                    "No pending key of type {} for device {}",
                    key_type, self.device_identification
                ))
            })?;
        for key in self.security_keys.iter_mut() {
            if key.key_type == key_type && key.status == KeyStatus::Valid {
                key.status = KeyStatus::Invalid;
            }
        }
        self.security_keys[pending].status = KeyStatus::Valid;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device_with_keys() -> Device {
        let mut device = Device::new("E0000000000000001");
        device.security_keys = vec![
            SecurityKey::new(SecurityKeyType::EMeterAuthentication, "aa", KeyStatus::Valid),
            SecurityKey::new(SecurityKeyType::EMeterEncryption, "bb", KeyStatus::Valid),
            SecurityKey::new(SecurityKeyType::EMeterEncryption, "cc", KeyStatus::Invalid),
        ];
        device
    }

    #[test]
    fn test_valid_key_lookup() {
        let device = device_with_keys();
        assert_eq!(
            device.valid_security_key(SecurityKeyType::EMeterEncryption).map(|k| k.key.as_str()),
            Some("bb")
        );
        assert!(device.valid_security_key(SecurityKeyType::Password).is_none());
        assert!(!device.has_new_security_key());
    }

    #[test]
    fn test_promote_pending_key() {
        let mut device = device_with_keys();
        device.add_pending_key(SecurityKeyType::EMeterAuthentication, "dd");
        assert!(device.has_new_security_key());

        device.promote_pending_key(SecurityKeyType::EMeterAuthentication).unwrap();
        let valid: Vec<_> = device
            .security_keys
            .iter()
            .filter(|k| k.key_type == SecurityKeyType::EMeterAuthentication && k.status == KeyStatus::Valid)
            .collect();
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].key, "dd");
        assert!(!device.has_new_security_key());
    }

    #[test]
    fn test_promote_without_pending_key_fails() {
        let mut device = device_with_keys();
        assert!(device.promote_pending_key(SecurityKeyType::EMeterEncryption).is_err());
    }

    #[test]
    fn test_discard_invalid_keys() {
        let mut device = device_with_keys();
        device.discard_invalid_keys();
        assert_eq!(device.security_keys.len(), 2);
    }

    #[test]
    fn test_debug_hides_key_material() {
        let key = SecurityKey::new(SecurityKeyType::Password, "deadbeef", KeyStatus::Valid);
        assert!(!format!("{:?}", key).contains("deadbeef"));
    }
}
