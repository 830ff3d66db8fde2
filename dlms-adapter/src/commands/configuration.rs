//! Clock, administrative status, firmware version, special days and the
//! activity calendar

use crate::commands::helper::{get_with_list, protocol_error, read_required};
use crate::commands::{bundle_type_mismatch, BundleAction, CommandExecutor};
use crate::device::Device;
use crate::error::{AdapterError, AdapterResult};
use crate::holder::ConnectionHolder;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use dlms_client::{AttributeAddress, MethodParameter, SetParameter};
use dlms_core::{CosemDateTime, DataObject, ObisCode};
use serde::{Deserialize, Serialize};
use std::fmt;

const CLASS_ID_CLOCK: u16 = 8;
const OBIS_CODE_CLOCK: ObisCode = ObisCode::new(0, 0, 1, 0, 0, 255);
const ATTRIBUTE_ID_TIME: i8 = 2;

const CLASS_ID_DATA: u16 = 1;
const ATTRIBUTE_ID_VALUE: i8 = 2;
const OBIS_CODE_ADMINISTRATIVE_STATUS: ObisCode = ObisCode::new(0, 1, 94, 31, 0, 255);
const OBIS_CODE_FIRMWARE_VERSION: ObisCode = ObisCode::new(1, 0, 0, 2, 0, 255);

const CLASS_ID_SPECIAL_DAYS_TABLE: u16 = 11;
const OBIS_CODE_SPECIAL_DAYS_TABLE: ObisCode = ObisCode::new(0, 0, 11, 0, 0, 255);
const ATTRIBUTE_ID_ENTRIES: i8 = 2;

const CLASS_ID_ACTIVITY_CALENDAR: u16 = 20;
const OBIS_CODE_ACTIVITY_CALENDAR: ObisCode = ObisCode::new(0, 0, 13, 0, 0, 255);
const METHOD_ID_ACTIVATE_PASSIVE_CALENDAR: i8 = 1;

const DAY_OF_WEEK_NOT_SPECIFIED: u8 = 0xFF;

async fn set_attribute(holder: &mut ConnectionHolder, address: AttributeAddress, value: DataObject) -> AdapterResult<()> {
    holder.describe(&format!("write {}", address));
    let result = holder.get()?.set(SetParameter::new(address.clone(), value)).await?;
    if !result.is_success() {
        return Err(AdapterError::ProtocolAdapter(format!(
            "Writing {} failed with result {:?}",
            address, result
        )));
    }
    log::debug!("Wrote {}", address);
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynchronizeTimeRequest {
    pub date_time: DateTime<Utc>,
}

/// Sets the meter clock
#[derive(Debug, Default)]
pub struct SynchronizeTimeExecutor;

impl SynchronizeTimeExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl CommandExecutor for SynchronizeTimeExecutor {
    type Request = SynchronizeTimeRequest;
    type Response = ();

    async fn execute(
        &self,
        holder: &mut ConnectionHolder,
        device: &mut Device,
        request: SynchronizeTimeRequest,
    ) -> AdapterResult<()> {
        log::info!(
            "Synchronizing clock of device {} to {}",
            device.device_identification,
            request.date_time.to_rfc3339()
        );
        let time = DataObject::OctetString(CosemDateTime::from_utc(&request.date_time).encode());
        set_attribute(
            holder,
            AttributeAddress::new(CLASS_ID_CLOCK, OBIS_CODE_CLOCK, ATTRIBUTE_ID_TIME),
            time,
        )
        .await
    }

    fn from_bundle_input(&self, action: BundleAction) -> AdapterResult<SynchronizeTimeRequest> {
        match action {
            BundleAction::SynchronizeTime(request) => Ok(request),
            other => Err(bundle_type_mismatch("SynchronizeTime", &other)),
        }
    }
}

/// Value of the administrative status object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdministrativeStatusType {
    Undefined = 0,
    Unavailable = 1,
    Available = 2,
    On = 3,
}

impl AdministrativeStatusType {
    pub fn value(&self) -> u8 {
        *self as u8
    }

    pub fn from_value(value: u8) -> AdapterResult<Self> {
        match value {
            0 => Ok(Self::Undefined),
            1 => Ok(Self::Unavailable),
            2 => Ok(Self::Available),
            3 => Ok(Self::On),
            _ => Err(AdapterError::ProtocolAdapter(format!(
                "Unsupported administrative status value: {}",
                value
            ))),
        }
    }
}

impl fmt::Display for AdministrativeStatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Undefined => "UNDEFINED",
            Self::Unavailable => "UNAVAILABLE",
            Self::Available => "AVAILABLE",
            Self::On => "ON",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
pub struct SetAdministrativeStatusExecutor;

impl SetAdministrativeStatusExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl CommandExecutor for SetAdministrativeStatusExecutor {
    type Request = AdministrativeStatusType;
    type Response = ();

    async fn execute(
        &self,
        holder: &mut ConnectionHolder,
        device: &mut Device,
        request: AdministrativeStatusType,
    ) -> AdapterResult<()> {
        log::info!(
            "Setting administrative status of device {} to {}",
            device.device_identification,
            request
        );
        set_attribute(
            holder,
            AttributeAddress::new(CLASS_ID_DATA, OBIS_CODE_ADMINISTRATIVE_STATUS, ATTRIBUTE_ID_VALUE),
            DataObject::Enumerate(request.value()),
        )
        .await
    }

    fn from_bundle_input(&self, action: BundleAction) -> AdapterResult<AdministrativeStatusType> {
        match action {
            BundleAction::SetAdministrativeStatus(status) => Ok(status),
            other => Err(bundle_type_mismatch("SetAdministrativeStatus", &other)),
        }
    }
}

/// Reads the active firmware version as text
#[derive(Debug, Default)]
pub struct GetFirmwareVersionExecutor;

impl GetFirmwareVersionExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl CommandExecutor for GetFirmwareVersionExecutor {
    type Request = ();
    type Response = String;

    async fn execute(&self, holder: &mut ConnectionHolder, _device: &mut Device, _request: ()) -> AdapterResult<String> {
        let address = AttributeAddress::new(CLASS_ID_DATA, OBIS_CODE_FIRMWARE_VERSION, ATTRIBUTE_ID_VALUE);
        let results = get_with_list(holder, "retrieve firmware version", &[address]).await?;
        let bytes = read_required(&results[0], "firmware version")?
            .as_octet_string()
            .map_err(|e| protocol_error("firmware version", e))?;
        if !bytes.is_ascii() {
            return Err(AdapterError::ProtocolAdapter(format!(
                "Firmware version is not ASCII: {}",
                hex::encode(bytes)
            )));
        }
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn from_bundle_input(&self, action: BundleAction) -> AdapterResult<()> {
        match action {
            BundleAction::GetFirmwareVersion => Ok(()),
            other => Err(bundle_type_mismatch("GetFirmwareVersion", &other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialDay {
    pub date: NaiveDate,
    /// Day profile of the active calendar used on this date
    pub day_id: u8,
}

impl SpecialDay {
    /// `{index, date, day_id}` entry; the date is a 5-byte COSEM date
    fn to_data_object(&self, index: u16) -> AdapterResult<DataObject> {
        let year = u16::try_from(self.date.year())
            .map_err(|_| AdapterError::ProtocolAdapter(format!("Special day year out of range: {}", self.date)))?;
        let [year_high, year_low] = year.to_be_bytes();
        let date = vec![
            year_high,
            year_low,
            self.date.month() as u8,
            self.date.day() as u8,
            DAY_OF_WEEK_NOT_SPECIFIED,
        ];
        Ok(DataObject::Structure(vec![
            DataObject::Unsigned16(index),
            DataObject::OctetString(date),
            DataObject::Unsigned8(self.day_id),
        ]))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialDaysRequest {
    pub special_days: Vec<SpecialDay>,
}

/// Replaces the entries of the special days table
#[derive(Debug, Default)]
pub struct SetSpecialDaysExecutor;

impl SetSpecialDaysExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl CommandExecutor for SetSpecialDaysExecutor {
    type Request = SpecialDaysRequest;
    type Response = ();

    async fn execute(
        &self,
        holder: &mut ConnectionHolder,
        _device: &mut Device,
        request: SpecialDaysRequest,
    ) -> AdapterResult<()> {
        let entries = request
            .special_days
            .iter()
            .enumerate()
            .map(|(index, special_day)| {
                let index = u16::try_from(index)
                    .map_err(|_| AdapterError::ProtocolAdapter("Too many special days".to_string()))?;
                special_day.to_data_object(index)
            })
            .collect::<AdapterResult<Vec<_>>>()?;
        set_attribute(
            holder,
            AttributeAddress::new(CLASS_ID_SPECIAL_DAYS_TABLE, OBIS_CODE_SPECIAL_DAYS_TABLE, ATTRIBUTE_ID_ENTRIES),
            DataObject::Array(entries),
        )
        .await
    }

    fn from_bundle_input(&self, action: BundleAction) -> AdapterResult<SpecialDaysRequest> {
        match action {
            BundleAction::SetSpecialDays(request) => Ok(request),
            other => Err(bundle_type_mismatch("SetSpecialDays", &other)),
        }
    }
}

/// Makes the passive activity calendar the active one
#[derive(Debug, Default)]
pub struct ActivateActivityCalendarExecutor;

impl ActivateActivityCalendarExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl CommandExecutor for ActivateActivityCalendarExecutor {
    type Request = ();
    type Response = ();

    async fn execute(&self, holder: &mut ConnectionHolder, device: &mut Device, _request: ()) -> AdapterResult<()> {
        let parameter = MethodParameter::new(
            CLASS_ID_ACTIVITY_CALENDAR,
            OBIS_CODE_ACTIVITY_CALENDAR,
            METHOD_ID_ACTIVATE_PASSIVE_CALENDAR,
            Some(DataObject::Integer8(0)),
        );
        holder.describe(&format!("ActivateActivityCalendar on {}", OBIS_CODE_ACTIVITY_CALENDAR));
        let result = holder.get()?.action(parameter).await?;
        if !result.result_code.is_success() {
            return Err(AdapterError::ProtocolAdapter(format!(
                "Activating the passive calendar failed with result {:?}",
                result.result_code
            )));
        }
        log::info!("Activated passive activity calendar of device {}", device.device_identification);
        Ok(())
    }

    fn from_bundle_input(&self, action: BundleAction) -> AdapterResult<()> {
        match action {
            BundleAction::ActivateActivityCalendar => Ok(()),
            other => Err(bundle_type_mismatch("ActivateActivityCalendar", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holder::tests::connected_holder;
    use crate::testing::FakeMeter;
    use chrono::TimeZone;
    use dlms_client::MethodResultCode;

    #[tokio::test]
    async fn test_synchronize_time() {
        let meter = FakeMeter::shared();
        let mut device = Device::new("E1");
        let mut holder = connected_holder(meter.clone(), &mut device).await;
        let now = Utc.with_ymd_and_hms(2024, 10, 27, 2, 30, 0).unwrap();

        SynchronizeTimeExecutor::new()
            .execute(&mut holder, &mut device, SynchronizeTimeRequest { date_time: now })
            .await
            .unwrap();

        let meter = meter.lock().unwrap();
        let written = meter.value(CLASS_ID_CLOCK, OBIS_CODE_CLOCK, ATTRIBUTE_ID_TIME).unwrap();
        assert_eq!(written.as_date_time().unwrap().to_utc(), Some(now));
    }

    #[tokio::test]
    async fn test_set_administrative_status() {
        let meter = FakeMeter::shared();
        let mut device = Device::new("E1");
        let mut holder = connected_holder(meter.clone(), &mut device).await;

        let executor = SetAdministrativeStatusExecutor::new();
        let request = executor
            .from_bundle_input(BundleAction::SetAdministrativeStatus(AdministrativeStatusType::Available))
            .unwrap();
        executor.execute(&mut holder, &mut device, request).await.unwrap();

        assert_eq!(
            meter
                .lock()
                .unwrap()
                .value(CLASS_ID_DATA, OBIS_CODE_ADMINISTRATIVE_STATUS, ATTRIBUTE_ID_VALUE),
            Some(&DataObject::Enumerate(2))
        );
        assert!(AdministrativeStatusType::from_value(4).is_err());
    }

    #[tokio::test]
    async fn test_get_firmware_version() {
        let meter = FakeMeter::shared();
        meter.lock().unwrap().put(
            CLASS_ID_DATA,
            OBIS_CODE_FIRMWARE_VERSION,
            ATTRIBUTE_ID_VALUE,
            DataObject::OctetString(b"V4.2.1".to_vec()),
        );
        let mut device = Device::new("E1");
        let mut holder = connected_holder(meter, &mut device).await;

        let version = GetFirmwareVersionExecutor::new()
            .execute(&mut holder, &mut device, ())
            .await
            .unwrap();
        assert_eq!(version, "V4.2.1");
    }

    #[tokio::test]
    async fn test_set_special_days() {
        let meter = FakeMeter::shared();
        let mut device = Device::new("E1");
        let mut holder = connected_holder(meter.clone(), &mut device).await;
        let request = SpecialDaysRequest {
            special_days: vec![
                SpecialDay {
                    date: NaiveDate::from_ymd_opt(2024, 12, 25).unwrap(),
                    day_id: 2,
                },
                SpecialDay {
                    date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                    day_id: 3,
                },
            ],
        };

        SetSpecialDaysExecutor::new()
            .execute(&mut holder, &mut device, request)
            .await
            .unwrap();

        let meter = meter.lock().unwrap();
        let entries = meter
            .value(CLASS_ID_SPECIAL_DAYS_TABLE, OBIS_CODE_SPECIAL_DAYS_TABLE, ATTRIBUTE_ID_ENTRIES)
            .unwrap()
            .as_list()
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[1],
            DataObject::Structure(vec![
                DataObject::Unsigned16(1),
                DataObject::OctetString(vec![0x07, 0xE9, 1, 1, 0xFF]),
                DataObject::Unsigned8(3),
            ])
        );
    }

    #[tokio::test]
    async fn test_activate_activity_calendar_failure() {
        let meter = FakeMeter::shared();
        meter
            .lock()
            .unwrap()
            .action_results
            .push_back(MethodResultCode::ReadWriteDenied);
        let mut device = Device::new("E1");
        let mut holder = connected_holder(meter.clone(), &mut device).await;

        let result = ActivateActivityCalendarExecutor::new()
            .execute(&mut holder, &mut device, ())
            .await;

        assert!(matches!(result, Err(AdapterError::ProtocolAdapter(_))));
        let meter = meter.lock().unwrap();
        assert_eq!(meter.actions[0].method_id, METHOD_ID_ACTIVATE_PASSIVE_CALENDAR);
    }
}
