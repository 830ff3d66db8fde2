//! Security suite configuration for DLMS/COSEM associations
//!
//! The adapter opens meters with one of two suites:
//! - **HLS5-GMAC**: mutual authentication with GMAC plus AES-GCM-128 payload
//!   encryption, using an authentication key and a global unicast
//!   encryption key of equal length.
//! - **LLS1**: low-level security with a shared password.

use crate::keys::AES_128_KEY_LENGTH;
use dlms_core::{DlmsError, DlmsResult};
use std::fmt;

/// Security policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityPolicy {
    /// No encryption and authentication
    Nothing = 0,
    /// All messages to be authenticated and encrypted
    AuthenticatedAndEncrypted = 3,
}

/// Authentication mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationMechanism {
    /// Authentication of the client by sending a shared password as secret
    Low = 1,
    /// Authentication of both client and smart meter using GMAC
    Hls5Gmac = 5,
}

impl AuthenticationMechanism {
    /// Get mechanism ID
    pub fn id(&self) -> i32 {
        *self as i32
    }
}

/// Security suite of one association
#[derive(Clone, PartialEq, Eq)]
pub enum SecuritySuite {
    Hls5Gmac {
        authentication_key: Vec<u8>,
        global_unicast_encryption_key: Vec<u8>,
        challenge_length: Option<u32>,
    },
    Lls1 {
        password: Vec<u8>,
    },
}

impl SecuritySuite {
    /// HLS5 suite; both keys must be AES-128 keys
    pub fn hls5(
        authentication_key: Vec<u8>,
        global_unicast_encryption_key: Vec<u8>,
        challenge_length: Option<u32>,
    ) -> DlmsResult<Self> {
        validate_key("authentication", &authentication_key)?;
        validate_key("encryption", &global_unicast_encryption_key)?;
        if let Some(length) = challenge_length {
            if !(8..=64).contains(&length) {
                return Err(DlmsError::Security(format!(
                    "Challenge length must be between 8 and 64, got {}",
                    length
                )));
            }
        }
        Ok(SecuritySuite::Hls5Gmac {
            authentication_key,
            global_unicast_encryption_key,
            challenge_length,
        })
    }

    /// LLS1 suite with a plain password
    pub fn lls1(password: Vec<u8>) -> DlmsResult<Self> {
        if password.is_empty() {
            return Err(DlmsError::Security(
                "Password is not set for the security level low".to_string(),
            ));
        }
        Ok(SecuritySuite::Lls1 { password })
    }

    /// Get the authentication mechanism
    pub fn authentication_mechanism(&self) -> AuthenticationMechanism {
        match self {
            SecuritySuite::Hls5Gmac { .. } => AuthenticationMechanism::Hls5Gmac,
            SecuritySuite::Lls1 { .. } => AuthenticationMechanism::Low,
        }
    }

    /// Get the security policy
    pub fn security_policy(&self) -> SecurityPolicy {
        match self {
            SecuritySuite::Hls5Gmac { .. } => SecurityPolicy::AuthenticatedAndEncrypted,
            SecuritySuite::Lls1 { .. } => SecurityPolicy::Nothing,
        }
    }

    /// Get the authentication key
    pub fn authentication_key(&self) -> Option<&[u8]> {
        match self {
            SecuritySuite::Hls5Gmac { authentication_key, .. } => Some(authentication_key),
            SecuritySuite::Lls1 { .. } => None,
        }
    }

    /// Get the global unicast encryption key
    pub fn global_unicast_encryption_key(&self) -> Option<&[u8]> {
        match self {
            SecuritySuite::Hls5Gmac {
                global_unicast_encryption_key,
                ..
            } => Some(global_unicast_encryption_key),
            SecuritySuite::Lls1 { .. } => None,
        }
    }

    /// Replace the authentication key of an HLS5 suite
    pub fn update_authentication_key(&mut self, key: Vec<u8>) -> DlmsResult<()> {
        validate_key("authentication", &key)?;
        match self {
            SecuritySuite::Hls5Gmac { authentication_key, .. } => {
                *authentication_key = key;
                Ok(())
            }
            SecuritySuite::Lls1 { .. } => Err(DlmsError::Security(
                "Cannot change the authentication key of a low-level security association".to_string(),
            )),
        }
    }

    /// Replace the global unicast encryption key of an HLS5 suite
    pub fn update_global_unicast_encryption_key(&mut self, key: Vec<u8>) -> DlmsResult<()> {
        validate_key("encryption", &key)?;
        match self {
            SecuritySuite::Hls5Gmac {
                global_unicast_encryption_key,
                ..
            } => {
                *global_unicast_encryption_key = key;
                Ok(())
            }
            SecuritySuite::Lls1 { .. } => Err(DlmsError::Security(
                "Cannot change the encryption key of a low-level security association".to_string(),
            )),
        }
    }
}

fn validate_key(kind: &str, key: &[u8]) -> DlmsResult<()> {
    if key.len() != AES_128_KEY_LENGTH {
        return Err(DlmsError::Security(format!(
            "Invalid {} key length: expected {} bytes, got {}",
            kind,
            AES_128_KEY_LENGTH,
            key.len()
        )));
    }
    Ok(())
}

// Key material never ends up in logs.
impl fmt::Debug for SecuritySuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SecuritySuite(auth={:?}, policy={:?})",
            self.authentication_mechanism(),
            self.security_policy()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hls5_suite() {
        let suite = SecuritySuite::hls5(vec![1u8; 16], vec![2u8; 16], Some(16)).unwrap();
        assert_eq!(suite.authentication_mechanism(), AuthenticationMechanism::Hls5Gmac);
        assert_eq!(suite.security_policy(), SecurityPolicy::AuthenticatedAndEncrypted);
        assert_eq!(suite.authentication_key(), Some(&[1u8; 16][..]));
    }

    #[test]
    fn test_hls5_rejects_bad_lengths() {
        assert!(SecuritySuite::hls5(vec![1u8; 15], vec![2u8; 16], None).is_err());
        assert!(SecuritySuite::hls5(vec![1u8; 16], vec![2u8; 16], Some(4)).is_err());
    }

    #[test]
    fn test_update_keys() {
        let mut suite = SecuritySuite::hls5(vec![1u8; 16], vec![2u8; 16], None).unwrap();
        suite.update_authentication_key(vec![3u8; 16]).unwrap();
        suite.update_global_unicast_encryption_key(vec![4u8; 16]).unwrap();
        assert_eq!(suite.authentication_key(), Some(&[3u8; 16][..]));
        assert_eq!(suite.global_unicast_encryption_key(), Some(&[4u8; 16][..]));

        let mut lls = SecuritySuite::lls1(b"pw".to_vec()).unwrap();
        assert!(lls.update_authentication_key(vec![3u8; 16]).is_err());
    }

    #[test]
    fn test_debug_hides_keys() {
        let suite = SecuritySuite::lls1(b"hunter2".to_vec()).unwrap();
        assert!(!format!("{:?}", suite).contains("hunter2"));
    }
}
