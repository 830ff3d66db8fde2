use crate::config::SessionConfig;
use crate::device::Device;
use crate::error::{AdapterError, AdapterResult};
use crate::session::provider::{SessionProvider, SessionProviderRegistry, SmsClient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Resolves the address a device can be reached on for one connection attempt
pub struct SessionResolver {
    registry: SessionProviderRegistry,
    sms_client: Arc<dyn SmsClient>,
    config: SessionConfig,
}

impl SessionResolver {
    pub fn new(registry: SessionProviderRegistry, sms_client: Arc<dyn SmsClient>, config: SessionConfig) -> Self {
        Self {
            registry,
            sms_client,
            config,
        }
    }

    /// Resolve the current address of `device`
    ///
    /// Static devices get the address already on the record. Dynamic devices
    /// ask their session provider; without a session a wake-up SMS is sent
    /// and the provider is polled up to `retries` times. Cancelling `cancel`
    /// interrupts the wait between polls.
    pub async fn resolve_address(&self, device: &Device, cancel: &CancellationToken) -> AdapterResult<String> {
        if device.ip_address_is_static {
            return device.ip_address.clone().ok_or_else(|| {
                AdapterError::SessionResolution(format!(
                    "No static IP address supplied for device {}",
                    device.device_identification
                ))
            });
        }

        let provider = self.registry.get(&device.communication_provider)?;
        if let Some(address) = Self::query(provider.as_ref(), device).await? {
            return Ok(address);
        }

        log::info!(
            "Device {} has no session, sending wake-up SMS to {}",
            device.device_identification,
            device.iccid
        );
        if let Err(e) = self.sms_client.send_wake_up(&device.iccid).await {
            log::warn!("Failed to send wake-up SMS to device {}: {}", device.device_identification, e);
        }

        for attempt in 1..=self.config.retries {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(AdapterError::SessionResolution(format!(
                        "Interrupted while waiting for a session of device {}",
                        device.device_identification
                    )));
                }
                _ = tokio::time::sleep(self.config.sleep_between_retries()) => {}
            }
            if let Some(address) = Self::query(provider.as_ref(), device).await? {
                log::info!(
                    "Device {} has session with address {} after {} polls",
                    device.device_identification,
                    address,
                    attempt
                );
                return Ok(address);
            }
        }

        Err(AdapterError::SessionResolution(format!(
            "Session provider {} did not return an IP address for device {} and iccid {}",
            device.communication_provider, device.device_identification, device.iccid
        )))
    }

    async fn query(provider: &dyn SessionProvider, device: &Device) -> AdapterResult<Option<String>> {
        let address = provider.resolve_address(&device.iccid).await?;
        Ok(address.filter(|address| !address.is_empty()))
    }
}
