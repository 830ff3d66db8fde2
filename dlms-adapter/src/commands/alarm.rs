use crate::commands::helper::{get_with_list, protocol_error, read_required};
use crate::commands::{bundle_type_mismatch, BundleAction, CommandExecutor};
use crate::device::Device;
use crate::error::AdapterResult;
use crate::holder::ConnectionHolder;
use dlms_client::AttributeAddress;
use dlms_core::ObisCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const CLASS_ID_DATA: u16 = 1;
const OBIS_CODE_ALARM_REGISTER: ObisCode = ObisCode::new(0, 0, 97, 98, 0, 255);
const ATTRIBUTE_ID_VALUE: i8 = 2;

/// Alarms of the alarm register, one per bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlarmType {
    ClockInvalid,
    ReplaceBattery,
    PowerUp,
    ProgramMemoryError,
    RamError,
    NvMemoryError,
    MeasurementSystemError,
    WatchdogError,
    FraudAttempt,
    CommunicationErrorMBusChannel1,
    CommunicationErrorMBusChannel2,
    CommunicationErrorMBusChannel3,
    CommunicationErrorMBusChannel4,
    FraudAttemptMBusChannel1,
    FraudAttemptMBusChannel2,
    FraudAttemptMBusChannel3,
    FraudAttemptMBusChannel4,
    NewMBusDeviceDiscoveredChannel1,
    NewMBusDeviceDiscoveredChannel2,
    NewMBusDeviceDiscoveredChannel3,
    NewMBusDeviceDiscoveredChannel4,
}

impl AlarmType {
    const BITS: [(u32, AlarmType); 21] = [
        (0, AlarmType::ClockInvalid),
        (1, AlarmType::ReplaceBattery),
        (2, AlarmType::PowerUp),
        (8, AlarmType::ProgramMemoryError),
        (9, AlarmType::RamError),
        (10, AlarmType::NvMemoryError),
        (11, AlarmType::MeasurementSystemError),
        (12, AlarmType::WatchdogError),
        (13, AlarmType::FraudAttempt),
        (16, AlarmType::CommunicationErrorMBusChannel1),
        (17, AlarmType::CommunicationErrorMBusChannel2),
        (18, AlarmType::CommunicationErrorMBusChannel3),
        (19, AlarmType::CommunicationErrorMBusChannel4),
        (20, AlarmType::FraudAttemptMBusChannel1),
        (21, AlarmType::FraudAttemptMBusChannel2),
        (22, AlarmType::FraudAttemptMBusChannel3),
        (23, AlarmType::FraudAttemptMBusChannel4),
        (24, AlarmType::NewMBusDeviceDiscoveredChannel1),
        (25, AlarmType::NewMBusDeviceDiscoveredChannel2),
        (26, AlarmType::NewMBusDeviceDiscoveredChannel3),
        (27, AlarmType::NewMBusDeviceDiscoveredChannel4),
    ];

    pub fn bit(&self) -> u32 {
        Self::BITS
            .iter()
            .find(|(_, alarm_type)| alarm_type == self)
            .map_or(0, |(bit, _)| *bit)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmRegister {
    pub alarm_types: BTreeSet<AlarmType>,
}

impl AlarmRegister {
    /// Decode the register value; bits without an alarm type are ignored
    pub fn from_bits(register: u32) -> Self {
        let alarm_types = AlarmType::BITS
            .iter()
            .filter(|(bit, _)| register & (1u32 << *bit) != 0)
            .map(|(_, alarm_type)| *alarm_type)
            .collect();
        Self { alarm_types }
    }
}

#[derive(Debug, Default)]
pub struct ReadAlarmRegisterExecutor;

impl ReadAlarmRegisterExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl CommandExecutor for ReadAlarmRegisterExecutor {
    type Request = ();
    type Response = AlarmRegister;

    async fn execute(
        &self,
        holder: &mut ConnectionHolder,
        device: &mut Device,
        _request: (),
    ) -> AdapterResult<AlarmRegister> {
        let address = AttributeAddress::new(CLASS_ID_DATA, OBIS_CODE_ALARM_REGISTER, ATTRIBUTE_ID_VALUE);
        let results = get_with_list(holder, "retrieve alarm register", &[address]).await?;
        let register = read_required(&results[0], "alarm register")?
            .as_unsigned32()
            .map_err(|e| protocol_error("alarm register", e))?;
        let alarm_register = AlarmRegister::from_bits(register);
        log::info!(
            "Alarm register of device {}: {:#010X} {:?}",
            device.device_identification,
            register,
            alarm_register.alarm_types
        );
        Ok(alarm_register)
    }

    fn from_bundle_input(&self, action: BundleAction) -> AdapterResult<()> {
        match action {
            BundleAction::ReadAlarmRegister => Ok(()),
            other => Err(bundle_type_mismatch("ReadAlarmRegister", &other)),
        }
    }
}
