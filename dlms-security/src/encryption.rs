//! Platform encryption of key material at rest
//!
//! Keys stored with a device are encrypted with a platform key that is
//! independent of the DLMS-level security of a session. The stored form is
//! `nonce (12 bytes) || ciphertext+tag`.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes128Gcm, Key, Nonce,
};
use dlms_core::{DlmsError, DlmsResult};

const NONCE_LENGTH: usize = 12;

/// AES-128-GCM encryption with the platform key
#[derive(Clone)]
pub struct EncryptionService {
    cipher: Aes128Gcm,
}

impl EncryptionService {
    /// Create a new service from the 16-byte platform key
    pub fn new(platform_key: &[u8]) -> DlmsResult<Self> {
        if platform_key.len() != 16 {
            return Err(DlmsError::Security(format!(
                "Invalid AES-128 key length: expected 16 bytes, got {}",
                platform_key.len()
            )));
        }

        let key = Key::<Aes128Gcm>::from_slice(platform_key);
        Ok(Self {
            cipher: Aes128Gcm::new(key),
        })
    }

    /// Encrypt key material for storage
    pub fn encrypt(&self, plaintext: &[u8]) -> DlmsResult<Vec<u8>> {
        let nonce = Aes128Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| DlmsError::Security(format!("Encryption failed: {}", e)))?;

        let mut stored = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        stored.extend_from_slice(&nonce);
        stored.extend_from_slice(&ciphertext);
        Ok(stored)
    }

    /// Decrypt stored key material
    pub fn decrypt(&self, stored: &[u8]) -> DlmsResult<Vec<u8>> {
        if stored.len() <= NONCE_LENGTH {
            return Err(DlmsError::Security(format!(
                "Encrypted key too short: {} bytes",
                stored.len()
            )));
        }

        let (nonce, ciphertext) = stored.split_at(NONCE_LENGTH);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| DlmsError::Security(format!("Decryption failed: {}", e)))
    }
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_aes128_key;

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let service = EncryptionService::new(&[7u8; 16]).unwrap();
        for _ in 0..8 {
            let key = generate_aes128_key().unwrap();
            let stored = service.encrypt(&key).unwrap();
            assert_ne!(&stored[NONCE_LENGTH..], key.as_slice());
            assert_eq!(service.decrypt(&stored).unwrap(), key);
        }
    }

    #[test]
    fn test_decrypt_with_other_platform_key_fails() {
        let stored = EncryptionService::new(&[1u8; 16]).unwrap().encrypt(b"secret").unwrap();
        let other = EncryptionService::new(&[2u8; 16]).unwrap();
        assert!(other.decrypt(&stored).is_err());
    }

    #[test]
    fn test_rejects_short_input_and_bad_key() {
        let service = EncryptionService::new(&[0u8; 16]).unwrap();
        assert!(service.decrypt(&[0u8; 4]).is_err());
        assert!(EncryptionService::new(&[0u8; 8]).is_err());
    }
}
