//! Scoped ownership of the connection used by one command
//!
//! A [`ConnectionHolder`] holds at most one live connection. It is created
//! for one command, connected, handed to the executor and closed again on
//! every exit path. Closing only releases the transport; no release request
//! is sent to the meter.

use crate::connector::DlmsConnector;
use crate::device::Device;
use crate::error::{AdapterError, AdapterResult};
use crate::session::SessionResolver;
use dlms_client::{DlmsConnection, DlmsMessageListener};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct ConnectionHolder {
    connector: Arc<dyn DlmsConnector>,
    resolver: Arc<SessionResolver>,
    listener: Arc<dyn DlmsMessageListener>,
    cancel: CancellationToken,
    connection: Option<Box<dyn DlmsConnection>>,
}

impl ConnectionHolder {
    pub fn new(
        connector: Arc<dyn DlmsConnector>,
        resolver: Arc<SessionResolver>,
        listener: Arc<dyn DlmsMessageListener>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            connector,
            resolver,
            listener,
            cancel,
            connection: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Wire-trace hook of this holder's connection
    pub fn listener(&self) -> &Arc<dyn DlmsMessageListener> {
        &self.listener
    }

    /// Describe the operation the next messages belong to
    pub fn describe(&self, description: &str) {
        self.listener.set_description(description);
    }

    pub async fn connect(&mut self, device: &mut Device) -> AdapterResult<()> {
        if self.connection.is_some() {
            return Err(AdapterError::ProtocolAdapter(format!(
                "Cannot create a new connection to device {}, because a connection already exists",
                device.device_identification
            )));
        }
        let connection = self.connector.connect(device, self.listener.clone()).await?;
        self.connection = Some(connection);
        Ok(())
    }

    pub fn get(&mut self) -> AdapterResult<&mut (dyn DlmsConnection + 'static)> {
        self.connection.as_deref_mut().ok_or_else(|| {
            AdapterError::ProtocolAdapter(
                "No connection available, call connect or reconnect first".to_string(),
            )
        })
    }

    /// Connect again after the previous connection was closed
    ///
    /// A dynamically addressed device may have a different address by now, so
    /// its address is resolved again before connecting.
    pub async fn reconnect(&mut self, device: &mut Device) -> AdapterResult<()> {
        if self.connection.is_some() {
            return Err(AdapterError::ProtocolAdapter(format!(
                "Cannot reconnect to device {} while a connection exists, close it first",
                device.device_identification
            )));
        }
        if !device.ip_address_is_static {
            let address = self.resolver.resolve_address(device, &self.cancel).await?;
            device.ip_address = Some(address);
        }
        self.connect(device).await
    }

    /// Release the transport; a no-op when there is no connection
    pub async fn close(&mut self) -> AdapterResult<()> {
        match self.connection.take() {
            Some(mut connection) => connection.close().await.map_err(AdapterError::from),
            None => Ok(()),
        }
    }
}
