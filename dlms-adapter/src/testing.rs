//! In-memory meter used by the unit tests

use dlms_client::{
    AccessResultCode, AttributeAddress, ConnectionFactory, ConnectionSettings, DlmsConnection,
    DlmsMessageListener, GetResult, MethodParameter, MethodResult, MethodResultCode, SetParameter,
};
use dlms_core::{DataObject, DlmsError, DlmsResult, ObisCode};
use dlms_security::EncryptionService;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub(crate) const PLATFORM_KEY: [u8; 16] = [0x42; 16];

pub(crate) fn encryption_service() -> EncryptionService {
    EncryptionService::new(&PLATFORM_KEY).unwrap()
}

/// Hex of `plain` encrypted with the test platform key
pub(crate) fn stored_key(plain: &[u8]) -> String {
    hex::encode(encryption_service().encrypt(plain).unwrap())
}

#[derive(Default)]
pub(crate) struct FakeMeter {
    pub attributes: HashMap<(u16, ObisCode, i8), DataObject>,
    pub get_requests: Vec<Vec<AttributeAddress>>,
    pub sets: Vec<SetParameter>,
    pub actions: Vec<MethodParameter>,
    /// Consumed front to back, `Success` once empty
    pub action_results: VecDeque<MethodResultCode>,
    pub client_authentication_key: Option<Vec<u8>>,
    pub client_encryption_key: Option<Vec<u8>>,
    pub close_count: usize,
    pub fail_close: bool,
}

impl FakeMeter {
    pub fn shared() -> Arc<Mutex<FakeMeter>> {
        Arc::new(Mutex::new(FakeMeter::default()))
    }

    pub fn put(&mut self, class_id: u16, obis_code: ObisCode, attribute_id: i8, value: DataObject) {
        self.attributes.insert((class_id, obis_code, attribute_id), value);
    }

    pub fn value(&self, class_id: u16, obis_code: ObisCode, attribute_id: i8) -> Option<&DataObject> {
        self.attributes.get(&(class_id, obis_code, attribute_id))
    }

    /// Number of GET requests that touched `obis_code`
    pub fn gets_for(&self, obis_code: ObisCode) -> usize {
        self.get_requests
            .iter()
            .filter(|request| request.iter().any(|address| address.obis_code == obis_code))
            .count()
    }
}

pub(crate) struct FakeConnection {
    meter: Arc<Mutex<FakeMeter>>,
}

impl FakeConnection {
    pub fn new(meter: Arc<Mutex<FakeMeter>>) -> Self {
        Self { meter }
    }
}

#[async_trait::async_trait]
impl DlmsConnection for FakeConnection {
    async fn get(&mut self, addresses: &[AttributeAddress]) -> DlmsResult<Vec<GetResult>> {
        let mut meter = self.meter.lock().unwrap();
        meter.get_requests.push(addresses.to_vec());
        Ok(addresses
            .iter()
            .map(|address| {
                match meter.value(address.class_id, address.obis_code, address.attribute_id) {
                    Some(value) => GetResult::success(value.clone()),
                    None => GetResult::failure(AccessResultCode::ObjectUndefined),
                }
            })
            .collect())
    }

    async fn set(&mut self, parameter: SetParameter) -> DlmsResult<AccessResultCode> {
        let mut meter = self.meter.lock().unwrap();
        let address = &parameter.address;
        meter.put(address.class_id, address.obis_code, address.attribute_id, parameter.value.clone());
        meter.sets.push(parameter);
        Ok(AccessResultCode::Success)
    }

    async fn action(&mut self, parameter: MethodParameter) -> DlmsResult<MethodResult> {
        let mut meter = self.meter.lock().unwrap();
        meter.actions.push(parameter);
        let result_code = meter.action_results.pop_front().unwrap_or(MethodResultCode::Success);
        Ok(MethodResult {
            result_code,
            return_data: None,
        })
    }

    async fn change_client_global_authentication_key(&mut self, key: &[u8]) -> DlmsResult<()> {
        self.meter.lock().unwrap().client_authentication_key = Some(key.to_vec());
        Ok(())
    }

    async fn change_client_global_encryption_key(&mut self, key: &[u8]) -> DlmsResult<()> {
        self.meter.lock().unwrap().client_encryption_key = Some(key.to_vec());
        Ok(())
    }

    async fn close(&mut self) -> DlmsResult<()> {
        let mut meter = self.meter.lock().unwrap();
        meter.close_count += 1;
        if meter.fail_close {
            return Err(DlmsError::Connection(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "socket already gone",
            )));
        }
        Ok(())
    }
}

/// Factory handing out [`FakeConnection`]s to one shared meter
pub(crate) struct FakeConnectionFactory {
    pub meter: Arc<Mutex<FakeMeter>>,
    pub opened: Mutex<Vec<ConnectionSettings>>,
    pub open_error: Option<fn() -> DlmsError>,
}

impl FakeConnectionFactory {
    pub fn new(meter: Arc<Mutex<FakeMeter>>) -> Self {
        Self {
            meter,
            opened: Mutex::new(Vec::new()),
            open_error: None,
        }
    }

    pub fn failing(open_error: fn() -> DlmsError) -> Self {
        Self {
            meter: FakeMeter::shared(),
            opened: Mutex::new(Vec::new()),
            open_error: Some(open_error),
        }
    }
}

#[async_trait::async_trait]
impl ConnectionFactory for FakeConnectionFactory {
    async fn open(
        &self,
        settings: ConnectionSettings,
        _listener: Arc<dyn DlmsMessageListener>,
    ) -> DlmsResult<Box<dyn DlmsConnection>> {
        if let Some(open_error) = self.open_error {
            return Err(open_error());
        }
        self.opened.lock().unwrap().push(settings);
        Ok(Box::new(FakeConnection::new(self.meter.clone())))
    }
}
