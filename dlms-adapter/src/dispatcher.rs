//! Running one command against one device
//!
//! [`DeviceRequestProcessor`] is the boundary the message-processing layer
//! calls: it loads the device, resolves its address, opens a connection,
//! runs the executor and always closes the connection again. Commands for
//! the same device are serialized.

use crate::commands::CommandExecutor;
use crate::connector::Connectors;
use crate::device::Device;
use crate::error::{AdapterError, AdapterResult, FunctionalExceptionType};
use crate::holder::ConnectionHolder;
use crate::listener::LoggingMessageListener;
use crate::repository::DeviceRepository;
use crate::session::SessionResolver;
use dlms_client::{DlmsMessageListener, NoopMessageListener};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// One async mutex per device identification
#[derive(Debug, Default)]
pub struct DeviceLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DeviceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock of `device_identification`, created on first use
    pub fn lock_for(&self, device_identification: &str) -> AdapterResult<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| AdapterError::Configuration("Device lock registry poisoned".to_string()))?;
        Ok(locks
            .entry(device_identification.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone())
    }

    /// Give back a lock from [`lock_for`](Self::lock_for)
    ///
    /// The entry is dropped once nobody else holds or waits for it, so the
    /// registry only keeps devices with commands in flight.
    pub fn release(&self, device_identification: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        drop(lock);
        if locks
            .get(device_identification)
            .is_some_and(|registered| Arc::strong_count(registered) == 1)
        {
            locks.remove(device_identification);
        }
    }
}

/// Result of a command that reached the executor
#[derive(Debug)]
pub enum CommandOutcome<Req, Resp> {
    Ok(Resp),
    /// The executor failed; the request is kept for diagnostics
    Failed { error: AdapterError, request: Req },
}

impl<Req, Resp> CommandOutcome<Req, Resp> {
    pub fn is_ok(&self) -> bool {
        matches!(self, CommandOutcome::Ok(_))
    }
}

pub struct DeviceRequestProcessor {
    repository: Arc<dyn DeviceRepository>,
    resolver: Arc<SessionResolver>,
    connectors: Connectors,
    locks: DeviceLocks,
}

impl DeviceRequestProcessor {
    pub fn new(repository: Arc<dyn DeviceRepository>, resolver: Arc<SessionResolver>, connectors: Connectors) -> Self {
        Self {
            repository,
            resolver,
            connectors,
            locks: DeviceLocks::new(),
        }
    }

    /// Run `request` on device `device_identification`
    ///
    /// `ip_address` is the address known to the caller, used for statically
    /// addressed devices. Session resolution and connection errors are
    /// returned as `Err` so that the caller can redeliver the request. Any
    /// error from the executor is returned as [`CommandOutcome::Failed`].
    pub async fn process<E: CommandExecutor>(
        &self,
        device_identification: &str,
        ip_address: Option<String>,
        request: E::Request,
        executor: &E,
        cancel: CancellationToken,
    ) -> AdapterResult<CommandOutcome<E::Request, E::Response>> {
        let lock = self.locks.lock_for(device_identification)?;
        let outcome = {
            let _guard = lock.lock().await;
            self.process_locked(device_identification, ip_address, request, executor, cancel)
                .await
        };
        self.locks.release(device_identification, lock);
        outcome
    }

    async fn process_locked<E: CommandExecutor>(
        &self,
        device_identification: &str,
        ip_address: Option<String>,
        request: E::Request,
        executor: &E,
        cancel: CancellationToken,
    ) -> AdapterResult<CommandOutcome<E::Request, E::Response>> {
        let mut device = self.find_device(device_identification).await?;
        if device.ip_address_is_static {
            if let Some(ip_address) = ip_address.filter(|address| !address.is_empty()) {
                device.ip_address = Some(ip_address);
            }
        } else {
            let address = self.resolver.resolve_address(&device, &cancel).await?;
            device.ip_address = Some(address);
        }

        let listener: Arc<dyn DlmsMessageListener> = if device.in_debug_mode {
            Arc::new(LoggingMessageListener::new(device.device_identification.clone()))
        } else {
            Arc::new(NoopMessageListener)
        };
        let connector = self.connectors.for_device(&device)?;
        let mut holder = ConnectionHolder::new(connector, self.resolver.clone(), listener, cancel);

        let result = match holder.connect(&mut device).await {
            Ok(()) => executor.execute(&mut holder, &mut device, request.clone()).await,
            Err(e) => Err(e),
        };
        if let Err(e) = holder.close().await {
            log::warn!(
                "Closing the connection to device {} failed: {}",
                device.device_identification,
                e
            );
        }

        match result {
            Ok(response) => Ok(CommandOutcome::Ok(response)),
            Err(error) if error.is_retryable() => Err(error),
            Err(error) => {
                log::error!(
                    "Command for device {} failed: {} (request {:?})",
                    device.device_identification,
                    error,
                    request
                );
                Ok(CommandOutcome::Failed { error, request })
            }
        }
    }

    async fn find_device(&self, device_identification: &str) -> AdapterResult<Device> {
        self.repository.find_device(device_identification).await?.ok_or_else(|| {
            AdapterError::functional(
                FunctionalExceptionType::UnknownDevice,
                format!("Device {} not found", device_identification),
            )
        })
    }
}
