//! Error taxonomy of the adapter
//!
//! Every failure a command can produce falls in one of five classes. The
//! class decides what the host does with the message:
//!
//! - [`AdapterError::SessionResolution`] and [`AdapterError::Connection`] are
//!   transient and the message is redelivered later
//! - [`AdapterError::Configuration`] and [`AdapterError::ConcurrentModification`]
//!   need an operator or a fresh read of the device record
//! - [`AdapterError::ProtocolAdapter`] and [`AdapterError::Functional`] end
//!   the command with an error response

use dlms_core::DlmsError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Business-rule violations reported back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionalExceptionType {
    UnknownDevice,
    BundleTypeMismatch,
}

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Session resolution error: {0}")]
    SessionResolution(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Device {device_identification} was modified concurrently (expected version {expected}, found {found})")]
    ConcurrentModification {
        device_identification: String,
        expected: u64,
        found: u64,
    },

    #[error("Protocol adapter error: {0}")]
    ProtocolAdapter(String),

    #[error("Functional error ({kind:?}): {message}")]
    Functional {
        kind: FunctionalExceptionType,
        message: String,
    },
}

impl AdapterError {
    pub fn functional(kind: FunctionalExceptionType, message: impl Into<String>) -> Self {
        AdapterError::Functional {
            kind,
            message: message.into(),
        }
    }

    /// Whether redelivering the same message later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AdapterError::SessionResolution(_) | AdapterError::Connection(_)
        )
    }
}

/// Lower-level DLMS errors: I/O is transient, an unknown host is a
/// configuration problem, the rest is an unexpected device response.
impl From<DlmsError> for AdapterError {
    fn from(error: DlmsError) -> Self {
        match error {
            DlmsError::UnknownHost(host) => {
                AdapterError::Configuration(format!("The IP address is not found: {}", host))
            }
            e if e.is_io() => AdapterError::Connection(e.to_string()),
            e => AdapterError::ProtocolAdapter(e.to_string()),
        }
    }
}

pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_dlms_error_classification() {
        let io_error: AdapterError = DlmsError::Connection(io::Error::new(io::ErrorKind::BrokenPipe, "gone")).into();
        assert!(matches!(io_error, AdapterError::Connection(_)));
        assert!(io_error.is_retryable());

        let unknown: AdapterError = DlmsError::UnknownHost("meter.invalid".to_string()).into();
        assert!(matches!(unknown, AdapterError::Configuration(_)));
        assert!(!unknown.is_retryable());

        let data: AdapterError = DlmsError::InvalidData("bad".to_string()).into();
        assert!(matches!(data, AdapterError::ProtocolAdapter(_)));
    }
}
