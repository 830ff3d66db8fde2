//! Wire trace of devices in debug mode

use dlms_client::{DlmsMessageListener, MessageDirection, RawMessageData};
use std::sync::Mutex;

/// Logs every APDU exchanged with one device at debug level
pub struct LoggingMessageListener {
    device_identification: String,
    description: Mutex<String>,
}

impl LoggingMessageListener {
    pub fn new(device_identification: impl Into<String>) -> Self {
        Self {
            device_identification: device_identification.into(),
            description: Mutex::new(String::new()),
        }
    }
}

impl DlmsMessageListener for LoggingMessageListener {
    fn message_captured(&self, message: RawMessageData) {
        let description = self
            .description
            .lock()
            .map(|description| description.clone())
            .unwrap_or_default();
        let arrow = match message.direction {
            MessageDirection::Sent => "->",
            MessageDirection::Received => "<-",
        };
        log::debug!(
            "[{}] {} {} {} ({})",
            self.device_identification,
            message.captured_at.to_rfc3339(),
            arrow,
            hex::encode(&message.apdu),
            description
        );
    }

    fn set_description(&self, description: &str) {
        if let Ok(mut current) = self.description.lock() {
            *current = description.to_string();
        }
    }
}
