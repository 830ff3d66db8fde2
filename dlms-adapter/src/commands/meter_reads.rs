//! Actual meter reads of the E-meter registers and of an M-Bus gas meter

use crate::commands::helper::{get_with_list, protocol_error, read_required};
use crate::commands::{bundle_type_mismatch, check_channel, BundleAction, CommandExecutor, MeterValue};
use crate::device::Device;
use crate::error::{AdapterError, AdapterResult};
use crate::holder::ConnectionHolder;
use chrono::{DateTime, Utc};
use dlms_client::{AttributeAddress, GetResult};
use dlms_core::{ObisCode, ScalerUnit};
use serde::{Deserialize, Serialize};

const CLASS_ID_CLOCK: u16 = 8;
const OBIS_CODE_CLOCK: ObisCode = ObisCode::new(0, 0, 1, 0, 0, 255);
const ATTRIBUTE_ID_TIME: i8 = 2;

const CLASS_ID_REGISTER: u16 = 3;
const ATTRIBUTE_ID_VALUE: i8 = 2;
const ATTRIBUTE_ID_SCALER_UNIT: i8 = 3;

const CLASS_ID_EXTENDED_REGISTER: u16 = 4;
const ATTRIBUTE_ID_CAPTURE_TIME: i8 = 5;

/// Active energy registers in response order
const ENERGY_REGISTERS: [(ObisCode, &str); 6] = [
    (ObisCode::new(1, 0, 1, 8, 0, 255), "active energy import"),
    (ObisCode::new(1, 0, 1, 8, 1, 255), "active energy import tariff 1"),
    (ObisCode::new(1, 0, 1, 8, 2, 255), "active energy import tariff 2"),
    (ObisCode::new(1, 0, 2, 8, 0, 255), "active energy export"),
    (ObisCode::new(1, 0, 2, 8, 1, 255), "active energy export tariff 1"),
    (ObisCode::new(1, 0, 2, 8, 2, 255), "active energy export tariff 2"),
];

fn clock_time() -> AttributeAddress {
    AttributeAddress::new(CLASS_ID_CLOCK, OBIS_CODE_CLOCK, ATTRIBUTE_ID_TIME)
}

fn read_time(result: &GetResult, description: &str) -> AdapterResult<DateTime<Utc>> {
    read_required(result, description)?
        .as_date_time()
        .map_err(|e| protocol_error(description, e))?
        .to_utc()
        .ok_or_else(|| AdapterError::ProtocolAdapter(format!("Unexpected unspecified value for {}", description)))
}

fn read_scaled(value: &GetResult, scaler_unit: &GetResult, description: &str) -> AdapterResult<MeterValue> {
    let raw = read_required(value, description)?
        .as_long()
        .map_err(|e| protocol_error(description, e))?;
    let scaler_unit_description = format!("scaler unit of {}", description);
    let scaler_unit = ScalerUnit::from_data_object(read_required(scaler_unit, &scaler_unit_description)?)
        .map_err(|e| protocol_error(&scaler_unit_description, e))?;
    Ok(MeterValue {
        value: scaler_unit.scale_value(raw),
        unit: scaler_unit.unit,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualMeterReads {
    pub log_time: DateTime<Utc>,
    pub active_energy_import: MeterValue,
    pub active_energy_import_tariff_one: MeterValue,
    pub active_energy_import_tariff_two: MeterValue,
    pub active_energy_export: MeterValue,
    pub active_energy_export_tariff_one: MeterValue,
    pub active_energy_export_tariff_two: MeterValue,
}

/// Reads the clock and the six active energy registers in one request
#[derive(Debug, Default)]
pub struct GetActualMeterReadsExecutor;

impl GetActualMeterReadsExecutor {
    pub fn new() -> Self {
        Self
    }

    fn addresses() -> Vec<AttributeAddress> {
        let mut addresses = vec![clock_time()];
        for (obis_code, _) in ENERGY_REGISTERS {
            addresses.push(AttributeAddress::new(CLASS_ID_REGISTER, obis_code, ATTRIBUTE_ID_VALUE));
            addresses.push(AttributeAddress::new(CLASS_ID_REGISTER, obis_code, ATTRIBUTE_ID_SCALER_UNIT));
        }
        addresses
    }
}

#[async_trait::async_trait]
impl CommandExecutor for GetActualMeterReadsExecutor {
    type Request = ();
    type Response = ActualMeterReads;

    async fn execute(
        &self,
        holder: &mut ConnectionHolder,
        _device: &mut Device,
        _request: (),
    ) -> AdapterResult<ActualMeterReads> {
        let results = get_with_list(holder, "retrieve actual meter reads", &Self::addresses()).await?;
        let log_time = read_time(&results[0], "clock")?;
        let values = ENERGY_REGISTERS
            .iter()
            .enumerate()
            .map(|(i, (_, description))| read_scaled(&results[1 + 2 * i], &results[2 + 2 * i], description))
            .collect::<AdapterResult<Vec<_>>>()?;

        Ok(ActualMeterReads {
            log_time,
            active_energy_import: values[0],
            active_energy_import_tariff_one: values[1],
            active_energy_import_tariff_two: values[2],
            active_energy_export: values[3],
            active_energy_export_tariff_one: values[4],
            active_energy_export_tariff_two: values[5],
        })
    }

    fn from_bundle_input(&self, action: BundleAction) -> AdapterResult<()> {
        match action {
            BundleAction::GetActualMeterReads => Ok(()),
            other => Err(bundle_type_mismatch("GetActualMeterReads", &other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualMeterReadsGasQuery {
    pub channel: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterReadsGas {
    pub log_time: DateTime<Utc>,
    pub consumption: MeterValue,
    pub capture_time: DateTime<Utc>,
}

/// Reads the current value of an M-Bus master value register
#[derive(Debug, Default)]
pub struct GetActualMeterReadsGasExecutor;

impl GetActualMeterReadsGasExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl CommandExecutor for GetActualMeterReadsGasExecutor {
    type Request = ActualMeterReadsGasQuery;
    type Response = MeterReadsGas;

    async fn execute(
        &self,
        holder: &mut ConnectionHolder,
        _device: &mut Device,
        request: ActualMeterReadsGasQuery,
    ) -> AdapterResult<MeterReadsGas> {
        let channel = check_channel(request.channel)?;
        let master_value = ObisCode::new(0, channel, 24, 2, 1, 255);
        let addresses = [
            clock_time(),
            AttributeAddress::new(CLASS_ID_EXTENDED_REGISTER, master_value, ATTRIBUTE_ID_VALUE),
            AttributeAddress::new(CLASS_ID_EXTENDED_REGISTER, master_value, ATTRIBUTE_ID_CAPTURE_TIME),
            AttributeAddress::new(CLASS_ID_EXTENDED_REGISTER, master_value, ATTRIBUTE_ID_SCALER_UNIT),
        ];
        let description = format!("retrieve actual meter reads for mbus {}", channel);
        let results = get_with_list(holder, &description, &addresses).await?;

        Ok(MeterReadsGas {
            log_time: read_time(&results[0], "clock")?,
            consumption: read_scaled(&results[1], &results[3], "gas value")?,
            capture_time: read_time(&results[2], "gas capture time")?,
        })
    }

    fn from_bundle_input(&self, action: BundleAction) -> AdapterResult<ActualMeterReadsGasQuery> {
        match action {
            BundleAction::GetActualMeterReadsGas(query) => Ok(query),
            other => Err(bundle_type_mismatch("GetActualMeterReadsGas", &other)),
        }
    }
}
