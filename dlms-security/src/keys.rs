//! Key identifiers and key generation

use aes::Aes128;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use dlms_core::{DlmsError, DlmsResult};
use ring::rand::{SecureRandom, SystemRandom};

/// Length in bytes of an AES-128 key
pub const AES_128_KEY_LENGTH: usize = 16;

/// Key identifier used by the Security Setup `key_transfer` method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyId {
    /// Global unicast encryption key
    GlobalUnicastEncryptionKey = 0,
    /// Global broadcast encryption key
    GlobalBroadcastEncryptionKey = 1,
    /// Authentication key
    AuthenticationKey = 2,
}

impl KeyId {
    /// Get key ID value
    pub fn id(&self) -> u8 {
        *self as u8
    }
}

/// Generate a random AES-128 key
pub fn generate_aes128_key() -> DlmsResult<Vec<u8>> {
    let rng = SystemRandom::new();
    let mut key = vec![0u8; AES_128_KEY_LENGTH];
    rng.fill(&mut key)
        .map_err(|_| DlmsError::Security("Failed to generate random key".to_string()))?;
    Ok(key)
}

/// Default initial value of the AES key wrap algorithm (RFC 3394)
const KEY_WRAP_IV: u64 = 0xA6A6_A6A6_A6A6_A6A6;

/// Wrap `key` with the master key (KEK) for the `key_transfer` method
///
/// AES-128 key wrap as specified in RFC 3394. The key to wrap must be a
/// multiple of 8 bytes and at least 16 bytes long; the result is 8 bytes
/// longer than the input.
pub fn wrap_key(master_key: &[u8], key: &[u8]) -> DlmsResult<Vec<u8>> {
    if master_key.len() != AES_128_KEY_LENGTH {
        return Err(DlmsError::InvalidData(format!(
            "Master key must be {} bytes, got {}",
            AES_128_KEY_LENGTH,
            master_key.len()
        )));
    }
    if key.len() < 16 || key.len() % 8 != 0 {
        return Err(DlmsError::InvalidData(format!(
            "Key to wrap must be a multiple of 8 bytes and at least 16 bytes, got {}",
            key.len()
        )));
    }

    let cipher = Aes128::new(GenericArray::from_slice(master_key));
    let n = key.len() / 8;
    let mut a = KEY_WRAP_IV;
    let mut r: Vec<[u8; 8]> = key
        .chunks_exact(8)
        .map(|chunk| {
            let mut block = [0u8; 8];
            block.copy_from_slice(chunk);
            block
        })
        .collect();

    for j in 0..6 {
        for (i, register) in r.iter_mut().enumerate() {
            let mut block = GenericArray::clone_from_slice(&[a.to_be_bytes(), *register].concat());
            cipher.encrypt_block(&mut block);
            let t = (n * j + i + 1) as u64;
            let mut msb = [0u8; 8];
            msb.copy_from_slice(&block[..8]);
            a = u64::from_be_bytes(msb) ^ t;
            register.copy_from_slice(&block[8..]);
        }
    }

    let mut wrapped = Vec::with_capacity(key.len() + 8);
    wrapped.extend_from_slice(&a.to_be_bytes());
    for register in r {
        wrapped.extend_from_slice(&register);
    }
    Ok(wrapped)
}
