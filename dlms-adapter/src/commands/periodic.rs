//! Periodic gas meter reads
//!
//! Gas reads are captured in three profiles: a per-channel interval profile
//! and the daily and monthly billing profiles shared by all four M-Bus
//! channels. A profile buffer is a list of rows, each row a list of column
//! values. Which column holds what depends on the period type, the channel
//! and whether the meter applied selective access:
//!
//! | period   | selective | value       | capture time | AMR status |
//! |----------|-----------|-------------|--------------|------------|
//! | interval | either    | 2           | 3            | 1          |
//! | daily    | no        | 6 + 2(ch-1) | 7 + 2(ch-1)  | 1          |
//! | daily    | yes       | 2           | 3            | 1          |
//! | monthly  | no        | 5 + 2(ch-1) | 6 + 2(ch-1)  | -          |
//! | monthly  | yes       | 1           | 2            | -          |
//!
//! The clock is always column 0. Rows whose clock is unspecified or outside
//! the requested period are skipped.

use crate::commands::helper::{get_with_list, read_required};
use crate::commands::{bundle_type_mismatch, check_channel, BundleAction, CommandExecutor, MeterValue};
use crate::device::Device;
use crate::error::{AdapterError, AdapterResult};
use crate::holder::ConnectionHolder;
use chrono::{DateTime, Utc};
use dlms_client::{AttributeAddress, CaptureObjectDefinition, SelectiveAccessDescription};
use dlms_core::{DataObject, ObisCode, ScalerUnit};
use serde::{Deserialize, Serialize};
use std::fmt;

const CLASS_ID_PROFILE_GENERIC: u16 = 7;
const ATTRIBUTE_ID_BUFFER: i8 = 2;
const OBIS_CODE_DAILY_BILLING: ObisCode = ObisCode::new(1, 0, 99, 2, 0, 255);
const OBIS_CODE_MONTHLY_BILLING: ObisCode = ObisCode::new(0, 0, 98, 1, 0, 255);

const CLASS_ID_CLOCK: u16 = 8;
const OBIS_CODE_CLOCK: ObisCode = ObisCode::new(0, 0, 1, 0, 0, 255);
const ATTRIBUTE_ID_TIME: i8 = 2;

const CLASS_ID_DATA: u16 = 1;
const OBIS_CODE_AMR_STATUS_DAILY: ObisCode = ObisCode::new(0, 0, 96, 10, 2, 255);
const ATTRIBUTE_ID_VALUE: i8 = 2;

const CLASS_ID_EXTENDED_REGISTER: u16 = 4;
const ATTRIBUTE_ID_MBUS_VALUE: i8 = 2;
const ATTRIBUTE_ID_MBUS_SCALER_UNIT: i8 = 3;
const ATTRIBUTE_ID_MBUS_CAPTURE_TIME: i8 = 5;

const CLOCK_INDEX: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodType {
    Interval,
    Daily,
    Monthly,
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PeriodType::Interval => "INTERVAL",
            PeriodType::Daily => "DAILY",
            PeriodType::Monthly => "MONTHLY",
        };
        f.write_str(name)
    }
}

/// Column positions of one buffer layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLayout {
    pub value_index: usize,
    pub capture_time_index: usize,
    pub amr_status_index: Option<usize>,
}

struct LayoutRule {
    period_type: PeriodType,
    selective_access: bool,
    value_base: usize,
    capture_time_base: usize,
    /// Columns of all channels present, two per channel
    per_channel: bool,
    amr_status_index: Option<usize>,
}

const LAYOUT_RULES: [LayoutRule; 6] = [
    LayoutRule {
        period_type: PeriodType::Interval,
        selective_access: false,
        value_base: 2,
        capture_time_base: 3,
        per_channel: false,
        amr_status_index: Some(1),
    },
    LayoutRule {
        period_type: PeriodType::Interval,
        selective_access: true,
        value_base: 2,
        capture_time_base: 3,
        per_channel: false,
        amr_status_index: Some(1),
    },
    LayoutRule {
        period_type: PeriodType::Daily,
        selective_access: false,
        value_base: 6,
        capture_time_base: 7,
        per_channel: true,
        amr_status_index: Some(1),
    },
    LayoutRule {
        period_type: PeriodType::Daily,
        selective_access: true,
        value_base: 2,
        capture_time_base: 3,
        per_channel: false,
        amr_status_index: Some(1),
    },
    LayoutRule {
        period_type: PeriodType::Monthly,
        selective_access: false,
        value_base: 5,
        capture_time_base: 6,
        per_channel: true,
        amr_status_index: None,
    },
    LayoutRule {
        period_type: PeriodType::Monthly,
        selective_access: true,
        value_base: 1,
        capture_time_base: 2,
        per_channel: false,
        amr_status_index: None,
    },
];

impl BufferLayout {
    /// Layout of the buffer returned for `period_type` and `channel`
    pub fn lookup(period_type: PeriodType, channel: u8, selective_access: bool) -> AdapterResult<Self> {
        let channel = check_channel(channel)?;
        let rule = LAYOUT_RULES
            .iter()
            .find(|rule| rule.period_type == period_type && rule.selective_access == selective_access)
            .ok_or_else(|| AdapterError::ProtocolAdapter(format!("periodtype {} not supported", period_type)))?;
        let offset = if rule.per_channel {
            (usize::from(channel) - 1) * 2
        } else {
            0
        };
        Ok(Self {
            value_index: rule.value_base + offset,
            capture_time_index: rule.capture_time_base + offset,
            amr_status_index: rule.amr_status_index,
        })
    }
}

/// Flags of the AMR profile status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AmrProfileStatus {
    CriticalError,
    ClockInvalid,
    DataNotValid,
    DaylightSaving,
    ClockAdjusted,
    PowerDown,
}

impl AmrProfileStatus {
    const BITS: [(u8, AmrProfileStatus); 6] = [
        (0, AmrProfileStatus::CriticalError),
        (1, AmrProfileStatus::ClockInvalid),
        (2, AmrProfileStatus::DataNotValid),
        (3, AmrProfileStatus::DaylightSaving),
        (5, AmrProfileStatus::ClockAdjusted),
        (7, AmrProfileStatus::PowerDown),
    ];

    /// Flags set in `status`; reserved bits 4 and 6 are ignored
    pub fn from_byte(status: u8) -> Vec<AmrProfileStatus> {
        Self::BITS
            .iter()
            .filter(|(bit, _)| status & (1u8 << *bit) != 0)
            .map(|(_, flag)| *flag)
            .collect()
    }
}

/// One decoded row of a profile buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedReading {
    /// Clock of the row
    pub log_time: DateTime<Utc>,
    pub consumption: MeterValue,
    /// When the M-Bus device last delivered the value
    pub capture_time: DateTime<Utc>,
    pub amr_status: Option<Vec<AmrProfileStatus>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodicMeterReadsQuery {
    pub period_type: PeriodType,
    pub channel: u8,
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodicMeterReadsGasResponse {
    pub period_type: PeriodType,
    pub readings: Vec<CapturedReading>,
}

/// Everything one decode needs, passed per call
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicReadsContext {
    pub period_type: PeriodType,
    pub channel: u8,
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub selective_access_supported: bool,
    pub scaler_unit: ScalerUnit,
}

impl PeriodicReadsContext {
    /// Decode the rows of `buffer`
    ///
    /// The readings are produced lazily, one per row that passes the period
    /// filter, and the returned iterator can be consumed only once.
    pub fn decode<'a>(&'a self, buffer: &'a [DataObject]) -> AdapterResult<PeriodicReadings<'a>> {
        let layout = BufferLayout::lookup(self.period_type, self.channel, self.selective_access_supported)?;
        Ok(PeriodicReadings {
            rows: buffer.iter(),
            context: self,
            layout,
        })
    }
}

/// Readings decoded from a profile buffer
pub struct PeriodicReadings<'a> {
    rows: std::slice::Iter<'a, DataObject>,
    context: &'a PeriodicReadsContext,
    layout: BufferLayout,
}

impl PeriodicReadings<'_> {
    fn decode_row(
        context: &PeriodicReadsContext,
        layout: &BufferLayout,
        row: &DataObject,
    ) -> AdapterResult<Option<CapturedReading>> {
        let columns = row
            .as_list()
            .map_err(|e| AdapterError::ProtocolAdapter(format!("Unexpected profile buffer row: {}", e)))?;

        let clock = Self::column(columns, CLOCK_INDEX, "clock")?;
        let log_time = if clock.is_null() {
            None
        } else {
            clock
                .as_date_time()
                .map_err(|e| AdapterError::ProtocolAdapter(format!("Unexpected clock value: {}", e)))?
                .to_utc()
        };
        let log_time = match log_time {
            Some(log_time) if log_time >= context.begin && log_time <= context.end => log_time,
            Some(log_time) => {
                log::warn!(
                    "Not using an object from capture buffer (clock={}), because the date does not match the given period: [{} .. {}]",
                    log_time.to_rfc3339(),
                    context.begin.to_rfc3339(),
                    context.end.to_rfc3339()
                );
                return Ok(None);
            }
            None => {
                log::warn!("Not using an object from capture buffer, because the clock is not specified");
                return Ok(None);
            }
        };

        let amr_status = match layout.amr_status_index {
            Some(index) => {
                let status = Self::column(columns, index, "AMR profile status")?;
                if status.is_null() {
                    None
                } else {
                    let byte = status
                        .as_unsigned8()
                        .map_err(|e| AdapterError::ProtocolAdapter(format!("Unexpected AMR profile status: {}", e)))?;
                    Some(AmrProfileStatus::from_byte(byte))
                }
            }
            None => None,
        };

        let raw_value = Self::column(columns, layout.value_index, "gas value")?
            .as_long()
            .map_err(|e| AdapterError::ProtocolAdapter(format!("Unexpected gas value: {}", e)))?;
        let scaler_unit = context.scaler_unit;
        let consumption = MeterValue {
            value: scaler_unit.scale_value(raw_value),
            unit: scaler_unit.unit,
        };

        let capture_time_column = Self::column(columns, layout.capture_time_index, "gas capture time")?;
        let capture_time = if capture_time_column.is_null() {
            None
        } else {
            capture_time_column
                .as_date_time()
                .map_err(|e| AdapterError::ProtocolAdapter(format!("Unexpected gas capture time: {}", e)))?
                .to_utc()
        };
        let capture_time = capture_time.ok_or_else(|| {
            AdapterError::ProtocolAdapter("Unexpected null/unspecified value for gas capture time".to_string())
        })?;

        log::debug!(
            "Decoded {} reading of channel {} logged at {}: {}",
            context.period_type,
            context.channel,
            log_time.to_rfc3339(),
            consumption
        );
        Ok(Some(CapturedReading {
            log_time,
            consumption,
            capture_time,
            amr_status,
        }))
    }

    fn column<'c>(columns: &'c [DataObject], index: usize, description: &str) -> AdapterResult<&'c DataObject> {
        columns.get(index).ok_or_else(|| {
            AdapterError::ProtocolAdapter(format!(
                "Profile buffer row has {} columns, no {} at index {}",
                columns.len(),
                description,
                index
            ))
        })
    }
}

impl Iterator for PeriodicReadings<'_> {
    type Item = AdapterResult<CapturedReading>;

    fn next(&mut self) -> Option<Self::Item> {
        for row in self.rows.by_ref() {
            match Self::decode_row(self.context, &self.layout, row) {
                Ok(Some(reading)) => return Some(Ok(reading)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}

/// Reads the gas profile buffer of one channel for a period
#[derive(Debug, Default)]
pub struct GetPeriodicMeterReadsGasExecutor;

impl GetPeriodicMeterReadsGasExecutor {
    pub fn new() -> Self {
        Self
    }

    fn master_value(channel: u8) -> ObisCode {
        ObisCode::new(0, channel, 24, 2, 1, 255)
    }

    fn profile_obis_code(period_type: PeriodType, channel: u8) -> ObisCode {
        match period_type {
            PeriodType::Interval => ObisCode::new(0, channel, 24, 3, 0, 255),
            PeriodType::Daily => OBIS_CODE_DAILY_BILLING,
            PeriodType::Monthly => OBIS_CODE_MONTHLY_BILLING,
        }
    }

    /// Columns requested with selective access, in buffer order
    fn selected_columns(period_type: PeriodType, channel: u8) -> Vec<CaptureObjectDefinition> {
        let clock = CaptureObjectDefinition::new(CLASS_ID_CLOCK, OBIS_CODE_CLOCK, ATTRIBUTE_ID_TIME);
        let value =
            CaptureObjectDefinition::new(CLASS_ID_EXTENDED_REGISTER, Self::master_value(channel), ATTRIBUTE_ID_MBUS_VALUE);
        let capture_time = CaptureObjectDefinition::new(
            CLASS_ID_EXTENDED_REGISTER,
            Self::master_value(channel),
            ATTRIBUTE_ID_MBUS_CAPTURE_TIME,
        );
        match period_type {
            PeriodType::Interval => {
                let amr_status =
                    CaptureObjectDefinition::new(CLASS_ID_DATA, ObisCode::new(0, channel, 96, 10, 3, 255), ATTRIBUTE_ID_VALUE);
                vec![clock, amr_status, value, capture_time]
            }
            PeriodType::Daily => {
                let amr_status = CaptureObjectDefinition::new(CLASS_ID_DATA, OBIS_CODE_AMR_STATUS_DAILY, ATTRIBUTE_ID_VALUE);
                vec![clock, amr_status, value, capture_time]
            }
            PeriodType::Monthly => vec![clock, value, capture_time],
        }
    }

    fn profile_buffer(context: &PeriodicReadsContext) -> AttributeAddress {
        let address = AttributeAddress::new(
            CLASS_ID_PROFILE_GENERIC,
            Self::profile_obis_code(context.period_type, context.channel),
            ATTRIBUTE_ID_BUFFER,
        );
        if !context.selective_access_supported {
            return address;
        }
        let restricting_object = CaptureObjectDefinition::new(CLASS_ID_CLOCK, OBIS_CODE_CLOCK, ATTRIBUTE_ID_TIME);
        let from = dlms_core::CosemDateTime::from_utc(&context.begin);
        let to = dlms_core::CosemDateTime::from_utc(&context.end);
        address.with_access_selection(SelectiveAccessDescription::range(
            restricting_object,
            &from,
            &to,
            &Self::selected_columns(context.period_type, context.channel),
        ))
    }

    async fn read_scaler_unit(holder: &mut ConnectionHolder, channel: u8) -> AdapterResult<ScalerUnit> {
        let address = AttributeAddress::new(
            CLASS_ID_EXTENDED_REGISTER,
            Self::master_value(channel),
            ATTRIBUTE_ID_MBUS_SCALER_UNIT,
        );
        let description = format!("retrieve scaler unit for mbus {}", channel);
        let results = get_with_list(holder, &description, &[address]).await?;
        let data = read_required(&results[0], "scaler unit")?;
        ScalerUnit::from_data_object(data)
            .map_err(|e| AdapterError::ProtocolAdapter(format!("Unexpected scaler unit: {}", e)))
    }
}

#[async_trait::async_trait]
impl CommandExecutor for GetPeriodicMeterReadsGasExecutor {
    type Request = PeriodicMeterReadsQuery;
    type Response = PeriodicMeterReadsGasResponse;

    async fn execute(
        &self,
        holder: &mut ConnectionHolder,
        device: &mut Device,
        request: PeriodicMeterReadsQuery,
    ) -> AdapterResult<PeriodicMeterReadsGasResponse> {
        let channel = check_channel(request.channel)?;
        let scaler_unit = Self::read_scaler_unit(holder, channel).await?;
        let context = PeriodicReadsContext {
            period_type: request.period_type,
            channel,
            begin: request.begin,
            end: request.end,
            selective_access_supported: device.selective_access_supported,
            scaler_unit,
        };

        let profile_buffer = Self::profile_buffer(&context);
        log::debug!(
            "Retrieving {} gas profile of channel {} for device {}: {}",
            context.period_type,
            channel,
            device.device_identification,
            profile_buffer
        );
        holder.describe(&format!(
            "GetPeriodicMeterReadsGas {} channel {}, retrieve {}",
            context.period_type, channel, profile_buffer
        ));
        let results = holder.get()?.get(std::slice::from_ref(&profile_buffer)).await?;
        let result = results.first().ok_or_else(|| {
            AdapterError::ProtocolAdapter(
                "No GetResult received while retrieving current billing period and profiles.".to_string(),
            )
        })?;
        if results.len() > 1 {
            log::info!(
                "Expected 1 GetResult while retrieving current billing period and profiles, got {}",
                results.len()
            );
        }
        let buffer = read_required(result, "profile buffer")?
            .as_list()
            .map_err(|e| AdapterError::ProtocolAdapter(format!("Unexpected profile buffer: {}", e)))?;

        let readings = context.decode(buffer)?.collect::<AdapterResult<Vec<_>>>()?;
        Ok(PeriodicMeterReadsGasResponse {
            period_type: context.period_type,
            readings,
        })
    }

    fn from_bundle_input(&self, action: BundleAction) -> AdapterResult<PeriodicMeterReadsQuery> {
        match action {
            BundleAction::GetPeriodicMeterReadsGas(query) => Ok(query),
            other => Err(bundle_type_mismatch("GetPeriodicMeterReadsGas", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holder::tests::connected_holder;
    use crate::testing::FakeMeter;
    use chrono::TimeZone;
    use dlms_core::{CosemDateTime, DlmsUnit};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn timestamp(instant: DateTime<Utc>) -> DataObject {
        DataObject::OctetString(CosemDateTime::from_utc(&instant).encode())
    }

    fn context(period_type: PeriodType, channel: u8, selective_access_supported: bool) -> PeriodicReadsContext {
        PeriodicReadsContext {
            period_type,
            channel,
            begin: at(1, 0),
            end: at(10, 0),
            selective_access_supported,
            scaler_unit: ScalerUnit::new(-2, DlmsUnit::CubicMetre),
        }
    }

    #[test]
    fn test_layout_table() {
        let daily_selective = BufferLayout::lookup(PeriodType::Daily, 3, true).unwrap();
        assert_eq!(daily_selective.value_index, 2);
        let daily_all = BufferLayout::lookup(PeriodType::Daily, 3, false).unwrap();
        assert_eq!(daily_all.value_index, 10);
        assert_eq!(daily_all.capture_time_index, 11);

        let monthly = BufferLayout::lookup(PeriodType::Monthly, 2, false).unwrap();
        assert_eq!(monthly.value_index, 7);
        assert_eq!(monthly.capture_time_index, 8);
        assert_eq!(monthly.amr_status_index, None);

        let interval = BufferLayout::lookup(PeriodType::Interval, 4, false).unwrap();
        assert_eq!((interval.value_index, interval.capture_time_index), (2, 3));
        assert!(BufferLayout::lookup(PeriodType::Interval, 5, false).is_err());
    }

    #[test]
    fn test_interval_row_is_scaled() {
        let buffer = vec![DataObject::Structure(vec![
            timestamp(at(2, 10)),
            DataObject::Unsigned8(0b1000_0100),
            DataObject::Unsigned32(1234),
            timestamp(at(2, 9)),
        ])];
        let context = context(PeriodType::Interval, 2, false);
        let readings: Vec<_> = context.decode(&buffer).unwrap().collect::<AdapterResult<_>>().unwrap();

        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].consumption.value, 12.34);
        assert_eq!(readings[0].consumption.unit, DlmsUnit::CubicMetre);
        assert_eq!(readings[0].consumption.to_string(), "12.34 m3");
        assert_eq!(readings[0].log_time, at(2, 10));
        assert_eq!(readings[0].capture_time, at(2, 9));
        assert_eq!(
            readings[0].amr_status,
            Some(vec![AmrProfileStatus::DataNotValid, AmrProfileStatus::PowerDown])
        );
    }

    #[test]
    fn test_rows_outside_period_are_skipped() {
        let row = |instant| {
            DataObject::Structure(vec![
                timestamp(instant),
                DataObject::Unsigned8(0),
                DataObject::Unsigned32(1),
                timestamp(instant),
            ])
        };
        let buffer = vec![
            row(at(11, 0)),
            DataObject::Structure(vec![
                DataObject::OctetString(CosemDateTime::unspecified().encode()),
                DataObject::Unsigned8(0),
                DataObject::Unsigned32(2),
                timestamp(at(3, 0)),
            ]),
            row(at(3, 0)),
        ];
        let context = context(PeriodType::Interval, 1, true);
        let readings: Vec<_> = context.decode(&buffer).unwrap().collect::<AdapterResult<_>>().unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].log_time, at(3, 0));
    }

    #[test]
    fn test_unspecified_capture_time_fails() {
        let buffer = vec![DataObject::Structure(vec![
            timestamp(at(2, 0)),
            DataObject::Unsigned32(55),
            DataObject::OctetString(CosemDateTime::unspecified().encode()),
        ])];
        let context = context(PeriodType::Monthly, 1, true);
        let mut readings = context.decode(&buffer).unwrap();
        assert!(matches!(readings.next(), Some(Err(AdapterError::ProtocolAdapter(_)))));
    }

    #[test]
    fn test_monthly_all_channels_reads_channel_columns() {
        let mut columns = vec![timestamp(at(1, 0))];
        columns.extend((1..=4u32).map(|register| DataObject::Unsigned32(register * 7)));
        for channel in 1..=4u32 {
            columns.push(DataObject::Unsigned32(channel * 100));
            columns.push(timestamp(at(1, 0)));
        }
        let buffer = vec![DataObject::Structure(columns)];
        let context = context(PeriodType::Monthly, 2, false);
        let readings: Vec<_> = context.decode(&buffer).unwrap().collect::<AdapterResult<_>>().unwrap();
        assert_eq!(readings[0].consumption.value, 2.0);
        assert_eq!(readings[0].amr_status, None);
    }

    #[tokio::test]
    async fn test_execute_daily_with_selective_access() {
        let meter = FakeMeter::shared();
        {
            let mut meter = meter.lock().unwrap();
            meter.put(
                CLASS_ID_EXTENDED_REGISTER,
                ObisCode::new(0, 3, 24, 2, 1, 255),
                ATTRIBUTE_ID_MBUS_SCALER_UNIT,
                DataObject::Structure(vec![DataObject::Integer8(-3), DataObject::Enumerate(14)]),
            );
            meter.put(
                CLASS_ID_PROFILE_GENERIC,
                OBIS_CODE_DAILY_BILLING,
                ATTRIBUTE_ID_BUFFER,
                DataObject::Array(vec![DataObject::Structure(vec![
                    timestamp(at(5, 0)),
                    DataObject::Unsigned8(0),
                    DataObject::Unsigned32(4500),
                    timestamp(at(4, 23)),
                ])]),
            );
        }
        let mut device = Device::new("E1");
        device.selective_access_supported = true;
        let mut holder = connected_holder(meter.clone(), &mut device).await;

        let request = PeriodicMeterReadsQuery {
            period_type: PeriodType::Daily,
            channel: 3,
            begin: at(1, 0),
            end: at(10, 0),
        };
        let response = GetPeriodicMeterReadsGasExecutor::new()
            .execute(&mut holder, &mut device, request)
            .await
            .unwrap();

        assert_eq!(response.readings.len(), 1);
        assert_eq!(response.readings[0].consumption.value, 4.5);
        assert_eq!(response.readings[0].consumption.unit, DlmsUnit::CubicMetreCorrected);

        let meter = meter.lock().unwrap();
        let buffer_request = &meter.get_requests[1][0];
        let selection = buffer_request.access_selection.as_ref().unwrap();
        assert_eq!(selection.selector, 1);
        assert_eq!(selection.selected_column_count(), 4);
    }

    #[test]
    fn test_bundle_input() {
        let executor = GetPeriodicMeterReadsGasExecutor::new();
        assert!(executor.from_bundle_input(BundleAction::GetActualMeterReads).is_err());
    }
}
