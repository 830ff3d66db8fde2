//! Carrier-facing boundaries of the session resolver

use crate::error::{AdapterError, AdapterResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Address lookup of a carrier's data sessions
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current IP address of the SIM, or `None` when it has no data session
    async fn resolve_address(&self, iccid: &str) -> AdapterResult<Option<String>>;
}

/// Wake-up SMS sender
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SmsClient: Send + Sync {
    async fn send_wake_up(&self, iccid: &str) -> AdapterResult<()>;
}

/// Session providers by communication provider name, built at startup
#[derive(Default, Clone)]
pub struct SessionProviderRegistry {
    providers: HashMap<String, Arc<dyn SessionProvider>>,
}

impl SessionProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, communication_provider: impl Into<String>, provider: Arc<dyn SessionProvider>) -> Self {
        self.providers.insert(communication_provider.into(), provider);
        self
    }

    pub fn get(&self, communication_provider: &str) -> AdapterResult<Arc<dyn SessionProvider>> {
        self.providers.get(communication_provider).cloned().ok_or_else(|| {
            AdapterError::Configuration(format!(
                "No session provider registered for communication provider {:?}",
                communication_provider
            ))
        })
    }
}
