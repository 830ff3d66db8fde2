//! Session resolution
//!
//! Meters on a cellular network have no fixed address unless their SIM has a
//! static IP. For the others the carrier's session provider is asked for the
//! address of the current data session. A meter without a session is woken
//! up by SMS and the provider is polled until the session shows up.

pub mod provider;
pub mod resolver;

pub use provider::{SessionProvider, SessionProviderRegistry, SmsClient};
pub use resolver::SessionResolver;
