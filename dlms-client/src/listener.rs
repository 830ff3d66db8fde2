//! Wire-trace hook
//!
//! A listener receives every raw APDU exchanged on a connection together
//! with a human readable description of what the adapter is doing. Devices
//! in debug mode get a recording listener; everyone else gets the no-op.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    Sent,
    Received,
}

/// One captured APDU
#[derive(Debug, Clone)]
pub struct RawMessageData {
    pub direction: MessageDirection,
    pub captured_at: DateTime<Utc>,
    pub apdu: Vec<u8>,
}

pub trait DlmsMessageListener: Send + Sync {
    fn message_captured(&self, message: RawMessageData);

    /// Describe the operation that the next messages belong to
    fn set_description(&self, description: &str);
}

/// Listener that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMessageListener;

impl DlmsMessageListener for NoopMessageListener {
    fn message_captured(&self, _message: RawMessageData) {}

    fn set_description(&self, _description: &str) {}
}
