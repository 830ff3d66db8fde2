//! Protocol adapter for smart meters speaking DLMS/COSEM
//!
//! The adapter runs commands against E-meters and the M-Bus gas meters
//! coupled to them. One command is one association:
//!
//! 1. the device record is read from the [`DeviceRepository`]
//! 2. the meter's address is resolved, waking the meter by SMS when it has
//!    no data session ([`SessionResolver`])
//! 3. a [`DlmsConnector`] opens a secured association (HLS5 or LLS1)
//! 4. a [`CommandExecutor`] issues GET/SET/ACTION requests
//! 5. the connection is closed, whatever the outcome
//!
//! [`DeviceRequestProcessor`] strings these steps together.

pub mod commands;
pub mod config;
pub mod connector;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod holder;
pub mod listener;
pub mod repository;
pub mod session;

#[cfg(test)]
mod testing;

pub use commands::{BundleAction, CommandExecutor, MeterValue};
pub use config::{AdapterConfig, ConnectionConfig, SessionConfig};
pub use connector::{Connectors, DlmsConnector, Hls5Connector, Lls1Connector, RecoverKeyProcessInitiator};
pub use device::{Device, KeyStatus, SecurityKey, SecurityKeyType};
pub use dispatcher::{CommandOutcome, DeviceLocks, DeviceRequestProcessor};
pub use error::{AdapterError, AdapterResult, FunctionalExceptionType};
pub use holder::ConnectionHolder;
pub use listener::LoggingMessageListener;
pub use repository::{DeviceRepository, InMemoryDeviceRepository};
pub use session::{SessionProvider, SessionProviderRegistry, SessionResolver, SmsClient};
