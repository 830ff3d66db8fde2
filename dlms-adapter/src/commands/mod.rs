//! Command executors
//!
//! Every meter operation is a [`CommandExecutor`]: a stateless object that
//! runs one request against the connection of a [`ConnectionHolder`] and
//! turns the device's answers into a response. Executors own their OBIS
//! addressing constants and nothing else, so one instance serves any number
//! of concurrent commands.
//!
//! Requests also arrive batched as a [`BundleAction`]; `from_bundle_input`
//! extracts the executor's own request type from it.
//!
//! # Errors
//! Unexpected device responses are reported as
//! [`AdapterError::ProtocolAdapter`]. Connection and configuration errors
//! from below pass through unchanged.

pub mod alarm;
pub mod configuration;
pub mod keys;
pub mod mbus;
pub mod meter_reads;
pub mod periodic;

mod helper;

pub use alarm::{AlarmRegister, AlarmType, ReadAlarmRegisterExecutor};
pub use configuration::{
    ActivateActivityCalendarExecutor, AdministrativeStatusType, GetFirmwareVersionExecutor,
    SetAdministrativeStatusExecutor, SetSpecialDaysExecutor, SpecialDay, SpecialDaysRequest,
    SynchronizeTimeExecutor, SynchronizeTimeRequest,
};
pub use keys::{GenerateAndReplaceKeysExecutor, KeyChangeResult, KeySet, ReplaceKeysExecutor};
pub use mbus::{
    ChannelSnapshot, CoupleMbusDeviceExecutor, CoupleMbusDeviceResponse, DecoupleMbusDeviceExecutor,
    DecoupleMbusDeviceRequest, DecoupleMbusDeviceResponse, MbusChannelElements,
};
pub use meter_reads::{
    ActualMeterReads, ActualMeterReadsGasQuery, GetActualMeterReadsExecutor, GetActualMeterReadsGasExecutor,
    MeterReadsGas,
};
pub use periodic::{
    AmrProfileStatus, CapturedReading, GetPeriodicMeterReadsGasExecutor, PeriodType, PeriodicMeterReadsGasResponse,
    PeriodicMeterReadsQuery, PeriodicReadsContext,
};

use crate::device::Device;
use crate::error::{AdapterError, AdapterResult, FunctionalExceptionType};
use crate::holder::ConnectionHolder;
use dlms_core::DlmsUnit;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request/response contract shared by all meter operations
#[async_trait::async_trait]
pub trait CommandExecutor: Send + Sync {
    type Request: Clone + fmt::Debug + Send + Sync + 'static;
    type Response: fmt::Debug + Send + 'static;

    /// Run `request` on the holder's connection
    ///
    /// The holder must be connected. `device` is the record the connection
    /// was opened for; executors that change key material update and persist
    /// it.
    async fn execute(
        &self,
        holder: &mut ConnectionHolder,
        device: &mut Device,
        request: Self::Request,
    ) -> AdapterResult<Self::Response>;

    /// Extract this executor's request from a batched action
    fn from_bundle_input(&self, action: BundleAction) -> AdapterResult<Self::Request>;

    async fn execute_bundle_action(
        &self,
        holder: &mut ConnectionHolder,
        device: &mut Device,
        action: BundleAction,
    ) -> AdapterResult<Self::Response> {
        let request = self.from_bundle_input(action)?;
        self.execute(holder, device, request).await
    }
}

/// One action of a batched request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BundleAction {
    ReplaceKeys(KeySet),
    GenerateAndReplaceKeys,
    GetPeriodicMeterReadsGas(PeriodicMeterReadsQuery),
    GetActualMeterReads,
    GetActualMeterReadsGas(ActualMeterReadsGasQuery),
    CoupleMbusDevice(MbusChannelElements),
    DecoupleMbusDevice(DecoupleMbusDeviceRequest),
    SynchronizeTime(SynchronizeTimeRequest),
    SetAdministrativeStatus(AdministrativeStatusType),
    GetFirmwareVersion,
    SetSpecialDays(SpecialDaysRequest),
    ActivateActivityCalendar,
    ReadAlarmRegister,
}

impl BundleAction {
    pub fn name(&self) -> &'static str {
        match self {
            BundleAction::ReplaceKeys(_) => "ReplaceKeys",
            BundleAction::GenerateAndReplaceKeys => "GenerateAndReplaceKeys",
            BundleAction::GetPeriodicMeterReadsGas(_) => "GetPeriodicMeterReadsGas",
            BundleAction::GetActualMeterReads => "GetActualMeterReads",
            BundleAction::GetActualMeterReadsGas(_) => "GetActualMeterReadsGas",
            BundleAction::CoupleMbusDevice(_) => "CoupleMbusDevice",
            BundleAction::DecoupleMbusDevice(_) => "DecoupleMbusDevice",
            BundleAction::SynchronizeTime(_) => "SynchronizeTime",
            BundleAction::SetAdministrativeStatus(_) => "SetAdministrativeStatus",
            BundleAction::GetFirmwareVersion => "GetFirmwareVersion",
            BundleAction::SetSpecialDays(_) => "SetSpecialDays",
            BundleAction::ActivateActivityCalendar => "ActivateActivityCalendar",
            BundleAction::ReadAlarmRegister => "ReadAlarmRegister",
        }
    }
}

pub(crate) fn bundle_type_mismatch(expected: &str, action: &BundleAction) -> AdapterError {
    AdapterError::functional(
        FunctionalExceptionType::BundleTypeMismatch,
        format!("Expected bundle action {}, got {}", expected, action.name()),
    )
}

/// Scaled register value with its unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeterValue {
    pub value: f64,
    pub unit: DlmsUnit,
}

impl fmt::Display for MeterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// Validate an M-Bus channel number
pub(crate) fn check_channel(channel: u8) -> AdapterResult<u8> {
    if (mbus::FIRST_CHANNEL..mbus::FIRST_CHANNEL + mbus::NR_OF_CHANNELS).contains(&channel) {
        Ok(channel)
    } else {
        Err(AdapterError::ProtocolAdapter(format!("channel {} not supported", channel)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_action_serde() {
        let action = BundleAction::DecoupleMbusDevice(DecoupleMbusDeviceRequest { channel: 2 });
        let yaml = serde_yml::to_string(&action).unwrap();
        let back: BundleAction = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(back, action);
        assert_eq!(back.name(), "DecoupleMbusDevice");
    }

    #[test]
    fn test_mismatch_is_functional() {
        let error = bundle_type_mismatch("ReplaceKeys", &BundleAction::GetFirmwareVersion);
        assert!(matches!(
            error,
            AdapterError::Functional {
                kind: FunctionalExceptionType::BundleTypeMismatch,
                ..
            }
        ));
    }

    #[test]
    fn test_check_channel() {
        assert!(check_channel(1).is_ok());
        assert!(check_channel(4).is_ok());
        assert!(check_channel(0).is_err());
        assert!(check_channel(5).is_err());
    }
}
