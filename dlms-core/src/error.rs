use thiserror::Error;

/// Error type for DLMS value handling and the client boundary
#[derive(Error, Debug)]
pub enum DlmsError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Unknown host: {0}")]
    UnknownHost(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Timeout")]
    Timeout,

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),
}

impl DlmsError {
    /// Whether the error originates from the transport (socket, timeout)
    pub fn is_io(&self) -> bool {
        matches!(self, DlmsError::Connection(_) | DlmsError::Timeout)
    }
}

/// Result type alias for DLMS operations
pub type DlmsResult<T> = Result<T, DlmsError>;
