//! Security module for DLMS/COSEM protocol
//!
//! This crate provides the security suites used to open meter associations,
//! key generation, and the platform encryption that protects key material
//! at rest.

pub mod suite;
pub mod encryption;
pub mod keys;

pub use encryption::EncryptionService;
pub use keys::{generate_aes128_key, wrap_key, KeyId, AES_128_KEY_LENGTH};
pub use suite::{AuthenticationMechanism, SecurityPolicy, SecuritySuite};
