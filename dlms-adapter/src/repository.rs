//! Persistence boundary for device records

use crate::device::Device;
use crate::error::{AdapterError, AdapterResult};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Device store
///
/// `save_device` is optimistic: the stored version must equal
/// `device.version`, otherwise [`AdapterError::ConcurrentModification`] is
/// returned and nothing is written. The saved record, with its version
/// bumped, is returned and must replace the caller's copy.
#[async_trait::async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn find_device(&self, device_identification: &str) -> AdapterResult<Option<Device>>;

    async fn save_device(&self, device: &Device) -> AdapterResult<Device>;
}

/// Repository backed by a map, for tests and single-process deployments
#[derive(Debug, Default)]
pub struct InMemoryDeviceRepository {
    devices: RwLock<HashMap<String, Device>>,
}

impl InMemoryDeviceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: impl IntoIterator<Item = Device>) -> Self {
        let devices = devices
            .into_iter()
            .map(|device| (device.device_identification.clone(), device))
            .collect();
        Self {
            devices: RwLock::new(devices),
        }
    }
}

#[async_trait::async_trait]
impl DeviceRepository for InMemoryDeviceRepository {
    async fn find_device(&self, device_identification: &str) -> AdapterResult<Option<Device>> {
        Ok(self.devices.read().await.get(device_identification).cloned())
    }

    async fn save_device(&self, device: &Device) -> AdapterResult<Device> {
        let mut devices = self.devices.write().await;
        if let Some(stored) = devices.get(&device.device_identification) {
            if stored.version != device.version {
                return Err(AdapterError::ConcurrentModification {
                    device_identification: device.device_identification.clone(),
                    expected: device.version,
                    found: stored.version,
                });
            }
        }
        let mut saved = device.clone();
        saved.version += 1;
        devices.insert(saved.device_identification.clone(), saved.clone());
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_bumps_version() {
        let repository = InMemoryDeviceRepository::new();
        let saved = repository.save_device(&Device::new("E1")).await.unwrap();
        assert_eq!(saved.version, 1);
        let found = repository.find_device("E1").await.unwrap().unwrap();
        assert_eq!(found.version, 1);
        assert!(repository.find_device("E2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_save_is_rejected() {
        let repository = InMemoryDeviceRepository::with_devices([Device::new("E1")]);
        let first = repository.find_device("E1").await.unwrap().unwrap();
        let mut second = first.clone();

        repository.save_device(&first).await.unwrap();
        second.in_debug_mode = true;
        let result = repository.save_device(&second).await;
        assert!(matches!(result, Err(AdapterError::ConcurrentModification { expected: 0, found: 1, .. })));
        assert!(!repository.find_device("E1").await.unwrap().unwrap().in_debug_mode);
    }
}
