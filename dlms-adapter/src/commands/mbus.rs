//! Coupling and decoupling of M-Bus devices
//!
//! An E-meter has four M-Bus channels, each described by an M-Bus client
//! setup object. Coupling looks for the channel a gas meter is (or should
//! be) installed on by comparing five attributes of every channel with what
//! is known about the gas meter:
//!
//! 1. a channel on which every known attribute matches wins immediately
//! 2. otherwise the occupied channel that agrees on the most attributes and
//!    conflicts on none, the lowest channel number breaking ties
//! 3. otherwise, for a gas meter without a primary address, the first empty
//!    channel, which then gets the gas meter's attributes written to it
//!
//! Finding no channel is a normal outcome, reported with the snapshots of
//! all probed channels.

use crate::commands::helper::{get_with_list, protocol_error, read_data};
use crate::commands::{bundle_type_mismatch, check_channel, BundleAction, CommandExecutor};
use crate::device::{Device, IdentificationNumber, ManufacturerId};
use crate::error::{AdapterError, AdapterResult};
use crate::holder::ConnectionHolder;
use dlms_client::{AttributeAddress, GetResult, SetParameter};
use dlms_core::{DataObject, ObisCode};
use serde::{Deserialize, Serialize};

pub const FIRST_CHANNEL: u8 = 1;
pub const NR_OF_CHANNELS: u8 = 4;

const CLASS_ID_MBUS_CLIENT_SETUP: u16 = 72;
const ATTRIBUTE_ID_PRIMARY_ADDRESS: i8 = 5;
const ATTRIBUTE_ID_IDENTIFICATION_NUMBER: i8 = 6;
const ATTRIBUTE_ID_MANUFACTURER_ID: i8 = 7;
const ATTRIBUTE_ID_VERSION: i8 = 8;
const ATTRIBUTE_ID_DEVICE_TYPE: i8 = 9;

const EMPTY_IDENTIFICATION_NUMBER: &str = "00000000";

fn mbus_client_setup(channel: u8) -> ObisCode {
    ObisCode::new(0, channel, 24, 1, 0, 255)
}

fn channel_attribute(channel: u8, attribute_id: i8) -> AttributeAddress {
    AttributeAddress::new(CLASS_ID_MBUS_CLIENT_SETUP, mbus_client_setup(channel), attribute_id)
}

/// Identification attributes of one M-Bus channel as read from the meter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub channel: u8,
    pub primary_address: u8,
    pub identification_number: String,
    pub manufacturer_identification: String,
    pub version: u8,
    pub device_type_identification: u8,
}

impl ChannelSnapshot {
    pub fn empty(channel: u8) -> Self {
        Self {
            channel,
            primary_address: 0,
            identification_number: EMPTY_IDENTIFICATION_NUMBER.to_string(),
            manufacturer_identification: String::new(),
            version: 0,
            device_type_identification: 0,
        }
    }

    /// Whether no M-Bus device is coupled on this channel
    pub fn is_empty(&self) -> bool {
        *self == Self::empty(self.channel)
    }

    fn from_results(channel: u8, results: &[GetResult]) -> AdapterResult<Self> {
        let primary_address = read_u8(&results[0], "primary address")?;
        let identification_number = match read_data(&results[1], "identification number")? {
            Some(data) => {
                let identification = data
                    .as_unsigned32()
                    .map_err(|e| protocol_error("identification number", e))?;
                IdentificationNumber::from_identification(identification)?.last_8_digits()
            }
            None => EMPTY_IDENTIFICATION_NUMBER.to_string(),
        };
        let manufacturer_identification = match read_data(&results[2], "manufacturer id")? {
            Some(data) => {
                let id = data.as_unsigned16().map_err(|e| protocol_error("manufacturer id", e))?;
                ManufacturerId::from_id(id)?.identification().to_string()
            }
            None => String::new(),
        };
        Ok(Self {
            channel,
            primary_address,
            identification_number,
            manufacturer_identification,
            version: read_u8(&results[3], "version")?,
            device_type_identification: read_u8(&results[4], "device type")?,
        })
    }
}

fn read_u8(result: &GetResult, description: &str) -> AdapterResult<u8> {
    read_data(result, description)?
        .map(|data| data.as_unsigned8().map_err(|e| protocol_error(description, e)))
        .transpose()
        .map(|value| value.unwrap_or(0))
}

/// What is known about the M-Bus device to couple; `None` is unknown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MbusChannelElements {
    pub primary_address: Option<u8>,
    pub identification_number: Option<String>,
    pub manufacturer_identification: Option<String>,
    pub version: Option<u8>,
    pub device_type_identification: Option<u8>,
}

/// Comparison of one attribute between a candidate and a channel
#[derive(Debug, Clone, Copy)]
struct AttributeComparison {
    known: bool,
    occupied: bool,
    equal: bool,
}

impl AttributeComparison {
    fn of<T: PartialEq>(candidate: Option<&T>, channel: &T, empty: &T) -> Self {
        Self {
            known: candidate.is_some(),
            occupied: channel != empty,
            equal: candidate == Some(channel),
        }
    }
}

impl MbusChannelElements {
    /// Canonical form: identification number as 8 digits, empty strings unknown
    fn normalized(&self) -> AdapterResult<Self> {
        let identification_number = match self.identification_number.as_deref() {
            None | Some("") => None,
            Some(digits) => Some(IdentificationNumber::from_last_8_digits(digits)?.last_8_digits()),
        };
        let manufacturer_identification = match self.manufacturer_identification.as_deref() {
            None | Some("") => None,
            Some(identification) => Some(ManufacturerId::from_identification(identification)?.identification().to_string()),
        };
        Ok(Self {
            identification_number,
            manufacturer_identification,
            ..self.clone()
        })
    }

    fn compare(&self, snapshot: &ChannelSnapshot) -> [AttributeComparison; 5] {
        let empty = ChannelSnapshot::empty(snapshot.channel);
        [
            AttributeComparison::of(self.primary_address.as_ref(), &snapshot.primary_address, &empty.primary_address),
            AttributeComparison::of(
                self.identification_number.as_ref(),
                &snapshot.identification_number,
                &empty.identification_number,
            ),
            AttributeComparison::of(
                self.manufacturer_identification.as_ref(),
                &snapshot.manufacturer_identification,
                &empty.manufacturer_identification,
            ),
            AttributeComparison::of(self.version.as_ref(), &snapshot.version, &empty.version),
            AttributeComparison::of(
                self.device_type_identification.as_ref(),
                &snapshot.device_type_identification,
                &empty.device_type_identification,
            ),
        ]
    }

    fn matches_fully(&self, snapshot: &ChannelSnapshot) -> bool {
        let comparisons = self.compare(snapshot);
        comparisons.iter().any(|c| c.known) && comparisons.iter().filter(|c| c.known).all(|c| c.equal)
    }

    /// Number of occupied attributes agreeing with this device, `None` on a conflict
    fn partial_match_score(&self, snapshot: &ChannelSnapshot) -> Option<usize> {
        if snapshot.is_empty() {
            return None;
        }
        let comparisons = self.compare(snapshot);
        if comparisons.iter().any(|c| c.known && c.occupied && !c.equal) {
            return None;
        }
        let score = comparisons.iter().filter(|c| c.known && c.occupied && c.equal).count();
        (score > 0).then_some(score)
    }

    /// Best partially matching snapshot; ties go to the lowest channel
    fn best_partial_match<'a>(&self, probed: &'a [ChannelSnapshot]) -> Option<&'a ChannelSnapshot> {
        probed
            .iter()
            .filter_map(|snapshot| self.partial_match_score(snapshot).map(|score| (score, snapshot)))
            .max_by(|(a, left), (b, right)| a.cmp(b).then(right.channel.cmp(&left.channel)))
            .map(|(_, snapshot)| snapshot)
    }

    /// The snapshot `channel` has after this device is written to it
    fn written_to(&self, channel: u8) -> ChannelSnapshot {
        let empty = ChannelSnapshot::empty(channel);
        ChannelSnapshot {
            channel,
            primary_address: self.primary_address.unwrap_or(empty.primary_address),
            identification_number: self
                .identification_number
                .clone()
                .unwrap_or(empty.identification_number),
            manufacturer_identification: self
                .manufacturer_identification
                .clone()
                .unwrap_or(empty.manufacturer_identification),
            version: self.version.unwrap_or(empty.version),
            device_type_identification: self.device_type_identification.unwrap_or(empty.device_type_identification),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoupleMbusDeviceResponse {
    /// Channel the device is coupled on, if any
    pub channel: Option<u8>,
    pub channel_snapshot: Option<ChannelSnapshot>,
    /// Every channel read while matching, in channel order
    pub probed: Vec<ChannelSnapshot>,
}

async fn read_channel(holder: &mut ConnectionHolder, channel: u8) -> AdapterResult<ChannelSnapshot> {
    let addresses = [
        ATTRIBUTE_ID_PRIMARY_ADDRESS,
        ATTRIBUTE_ID_IDENTIFICATION_NUMBER,
        ATTRIBUTE_ID_MANUFACTURER_ID,
        ATTRIBUTE_ID_VERSION,
        ATTRIBUTE_ID_DEVICE_TYPE,
    ]
    .map(|attribute_id| channel_attribute(channel, attribute_id));
    let description = format!("retrieve M-Bus client setup of channel {}", channel);
    let results = get_with_list(holder, &description, &addresses).await?;
    ChannelSnapshot::from_results(channel, &results)
}

async fn write_attribute(
    holder: &mut ConnectionHolder,
    channel: u8,
    attribute_id: i8,
    value: DataObject,
) -> AdapterResult<()> {
    let address = channel_attribute(channel, attribute_id);
    holder.describe(&format!("write {}", address));
    let result = holder.get()?.set(SetParameter::new(address.clone(), value)).await?;
    if !result.is_success() {
        return Err(AdapterError::ProtocolAdapter(format!(
            "Writing {} failed with result {:?}",
            address, result
        )));
    }
    Ok(())
}

/// Finds or assigns the channel of an M-Bus device
#[derive(Debug, Default)]
pub struct CoupleMbusDeviceExecutor;

impl CoupleMbusDeviceExecutor {
    pub fn new() -> Self {
        Self
    }

    async fn write_to_channel(
        &self,
        holder: &mut ConnectionHolder,
        candidate: &MbusChannelElements,
        channel: u8,
    ) -> AdapterResult<ChannelSnapshot> {
        if let Some(identification_number) = candidate.identification_number.as_deref() {
            let identification_number = IdentificationNumber::from_last_8_digits(identification_number)?;
            write_attribute(
                holder,
                channel,
                ATTRIBUTE_ID_IDENTIFICATION_NUMBER,
                identification_number.as_data_object(),
            )
            .await?;
        }
        if let Some(manufacturer_identification) = candidate.manufacturer_identification.as_deref() {
            let manufacturer_id = ManufacturerId::from_identification(manufacturer_identification)?;
            write_attribute(holder, channel, ATTRIBUTE_ID_MANUFACTURER_ID, manufacturer_id.as_data_object()).await?;
        }
        if let Some(version) = candidate.version {
            write_attribute(holder, channel, ATTRIBUTE_ID_VERSION, DataObject::Unsigned8(version)).await?;
        }
        if let Some(device_type) = candidate.device_type_identification {
            write_attribute(holder, channel, ATTRIBUTE_ID_DEVICE_TYPE, DataObject::Unsigned8(device_type)).await?;
        }
        Ok(candidate.written_to(channel))
    }
}

#[async_trait::async_trait]
impl CommandExecutor for CoupleMbusDeviceExecutor {
    type Request = MbusChannelElements;
    type Response = CoupleMbusDeviceResponse;

    async fn execute(
        &self,
        holder: &mut ConnectionHolder,
        device: &mut Device,
        request: MbusChannelElements,
    ) -> AdapterResult<CoupleMbusDeviceResponse> {
        let candidate = request.normalized()?;
        log::debug!(
            "Looking for an M-Bus channel on device {} for {:?}",
            device.device_identification,
            candidate
        );

        let mut probed = Vec::with_capacity(usize::from(NR_OF_CHANNELS));
        for channel in FIRST_CHANNEL..FIRST_CHANNEL + NR_OF_CHANNELS {
            let snapshot = read_channel(holder, channel).await?;
            let full_match = candidate.matches_fully(&snapshot);
            probed.push(snapshot);
            if full_match {
                log::info!("M-Bus device fully matches channel {}", channel);
                return Ok(CoupleMbusDeviceResponse {
                    channel: Some(channel),
                    channel_snapshot: probed.last().cloned(),
                    probed,
                });
            }
        }

        if let Some(snapshot) = candidate.best_partial_match(&probed) {
            log::info!("M-Bus device partially matches channel {}", snapshot.channel);
            return Ok(CoupleMbusDeviceResponse {
                channel: Some(snapshot.channel),
                channel_snapshot: Some(snapshot.clone()),
                probed: probed.clone(),
            });
        }

        if candidate.primary_address.is_none() {
            if let Some(index) = probed.iter().position(ChannelSnapshot::is_empty) {
                let channel = probed[index].channel;
                log::info!("Coupling M-Bus device on empty channel {}", channel);
                let snapshot = self.write_to_channel(holder, &candidate, channel).await?;
                probed[index] = snapshot.clone();
                return Ok(CoupleMbusDeviceResponse {
                    channel: Some(channel),
                    channel_snapshot: Some(snapshot),
                    probed,
                });
            }
        }

        log::info!(
            "No M-Bus channel found on device {} for {:?}",
            device.device_identification,
            candidate
        );
        Ok(CoupleMbusDeviceResponse {
            channel: None,
            channel_snapshot: None,
            probed,
        })
    }

    fn from_bundle_input(&self, action: BundleAction) -> AdapterResult<MbusChannelElements> {
        match action {
            BundleAction::CoupleMbusDevice(elements) => Ok(elements),
            other => Err(bundle_type_mismatch("CoupleMbusDevice", &other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoupleMbusDeviceRequest {
    pub channel: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoupleMbusDeviceResponse {
    pub channel: u8,
    /// Attributes of the device that was coupled before
    pub decoupled: ChannelSnapshot,
}

/// Clears an M-Bus channel
#[derive(Debug, Default)]
pub struct DecoupleMbusDeviceExecutor;

impl DecoupleMbusDeviceExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl CommandExecutor for DecoupleMbusDeviceExecutor {
    type Request = DecoupleMbusDeviceRequest;
    type Response = DecoupleMbusDeviceResponse;

    async fn execute(
        &self,
        holder: &mut ConnectionHolder,
        device: &mut Device,
        request: DecoupleMbusDeviceRequest,
    ) -> AdapterResult<DecoupleMbusDeviceResponse> {
        let channel = check_channel(request.channel)?;
        let decoupled = read_channel(holder, channel).await?;
        log::info!(
            "Decoupling M-Bus channel {} of device {}: {:?}",
            channel,
            device.device_identification,
            decoupled
        );

        write_attribute(holder, channel, ATTRIBUTE_ID_PRIMARY_ADDRESS, DataObject::Unsigned8(0)).await?;
        write_attribute(holder, channel, ATTRIBUTE_ID_IDENTIFICATION_NUMBER, DataObject::Unsigned32(0)).await?;
        write_attribute(holder, channel, ATTRIBUTE_ID_MANUFACTURER_ID, DataObject::Unsigned16(0)).await?;
        write_attribute(holder, channel, ATTRIBUTE_ID_VERSION, DataObject::Unsigned8(0)).await?;
        write_attribute(holder, channel, ATTRIBUTE_ID_DEVICE_TYPE, DataObject::Unsigned8(0)).await?;

        Ok(DecoupleMbusDeviceResponse { channel, decoupled })
    }

    fn from_bundle_input(&self, action: BundleAction) -> AdapterResult<DecoupleMbusDeviceRequest> {
        match action {
            BundleAction::DecoupleMbusDevice(request) => Ok(request),
            other => Err(bundle_type_mismatch("DecoupleMbusDevice", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holder::tests::connected_holder;
    use crate::testing::FakeMeter;
    use std::sync::{Arc, Mutex};

    fn install(meter: &Arc<Mutex<FakeMeter>>, channel: u8, values: (u8, u32, u16, u8, u8)) {
        let mut meter = meter.lock().unwrap();
        let obis_code = mbus_client_setup(channel);
        let (primary_address, identification, manufacturer, version, device_type) = values;
        meter.put(72, obis_code, 5, DataObject::Unsigned8(primary_address));
        meter.put(72, obis_code, 6, DataObject::Unsigned32(identification));
        meter.put(72, obis_code, 7, DataObject::Unsigned16(manufacturer));
        meter.put(72, obis_code, 8, DataObject::Unsigned8(version));
        meter.put(72, obis_code, 9, DataObject::Unsigned8(device_type));
    }

    fn gas_meter() -> MbusChannelElements {
        MbusChannelElements {
            primary_address: None,
            identification_number: Some("12345678".to_string()),
            manufacturer_identification: Some("LGB".to_string()),
            version: Some(1),
            device_type_identification: Some(3),
        }
    }

    async fn couple(meter: &Arc<Mutex<FakeMeter>>, candidate: MbusChannelElements) -> CoupleMbusDeviceResponse {
        let mut device = Device::new("E1");
        let mut holder = connected_holder(meter.clone(), &mut device).await;
        CoupleMbusDeviceExecutor::new()
            .execute(&mut holder, &mut device, candidate)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_full_match_stops_probing() {
        let meter = FakeMeter::shared();
        install(&meter, 1, (9, 0x87654321, 12514, 1, 3));
        install(&meter, 2, (10, 0x12345678, 12514, 1, 3));
        install(&meter, 3, (0, 0, 0, 0, 0));
        install(&meter, 4, (0, 0, 0, 0, 0));

        let response = couple(&meter, gas_meter()).await;

        assert_eq!(response.channel, Some(2));
        assert_eq!(response.probed.len(), 2);
        let snapshot = response.channel_snapshot.unwrap();
        assert_eq!(snapshot.primary_address, 10);
        assert_eq!(snapshot.identification_number, "12345678");
        let meter = meter.lock().unwrap();
        assert_eq!(meter.gets_for(mbus_client_setup(3)), 0);
        assert_eq!(meter.gets_for(mbus_client_setup(4)), 0);
        assert!(meter.sets.is_empty());
    }

    #[tokio::test]
    async fn test_unbound_device_is_written_to_empty_channel() {
        let meter = FakeMeter::shared();
        install(&meter, 1, (9, 0x11111111, 12514, 1, 3));
        install(&meter, 2, (10, 0x22222222, 12514, 1, 3));
        install(&meter, 3, (11, 0x33333333, 12514, 1, 3));
        install(&meter, 4, (0, 0, 0, 0, 0));
        let candidate = MbusChannelElements {
            manufacturer_identification: Some("GWF".to_string()),
            ..gas_meter()
        };

        let response = couple(&meter, candidate).await;

        assert_eq!(response.channel, Some(4));
        assert_eq!(response.probed.len(), 4);
        let written = response.channel_snapshot.unwrap();
        assert_eq!(written.identification_number, "12345678");
        assert_eq!(written.manufacturer_identification, "GWF");
        assert_eq!(response.probed[3], written);
        assert!(!response.probed[3].is_empty());
        let meter = meter.lock().unwrap();
        assert_eq!(meter.sets.len(), 4);
        let channel_4 = mbus_client_setup(4);
        assert_eq!(meter.value(72, channel_4, 6), Some(&DataObject::Unsigned32(0x12345678)));
        assert_eq!(
            meter.value(72, channel_4, 7),
            Some(&DataObject::Unsigned16(ManufacturerId::from_identification("GWF").unwrap().id()))
        );
        assert_eq!(meter.value(72, channel_4, 9), Some(&DataObject::Unsigned8(3)));
    }

    #[tokio::test]
    async fn test_partial_match_picks_most_agreeing_channel() {
        let meter = FakeMeter::shared();
        install(&meter, 1, (0, 0, 0, 0, 0));
        install(&meter, 2, (5, 0x12345678, 0, 0, 0));
        install(&meter, 3, (6, 0x12345678, 12514, 1, 0));
        install(&meter, 4, (7, 0x99999999, 12514, 1, 3));

        let response = couple(&meter, gas_meter()).await;

        assert_eq!(response.channel, Some(3));
        assert_eq!(response.channel_snapshot.unwrap().version, 1);
        assert_eq!(response.probed.len(), 4);
        assert!(meter.lock().unwrap().sets.is_empty());
    }

    #[tokio::test]
    async fn test_partial_match_tie_picks_lowest_channel() {
        let meter = FakeMeter::shared();
        install(&meter, 1, (0, 0, 0, 0, 0));
        install(&meter, 2, (5, 0x12345678, 0, 0, 0));
        install(&meter, 3, (6, 0x12345678, 0, 0, 0));
        install(&meter, 4, (0, 0, 0, 0, 0));

        let response = couple(&meter, gas_meter()).await;

        assert_eq!(response.channel, Some(2));
        assert_eq!(response.channel_snapshot.unwrap().primary_address, 5);
        assert!(meter.lock().unwrap().sets.is_empty());
    }

    #[tokio::test]
    async fn test_bound_device_without_match_is_not_written() {
        let meter = FakeMeter::shared();
        for channel in 1..=3 {
            install(&meter, channel, (channel, 0x11111111 * u32::from(channel), 12514, 1, 3));
        }
        install(&meter, 4, (0, 0, 0, 0, 0));
        let candidate = MbusChannelElements {
            primary_address: Some(20),
            ..gas_meter()
        };

        let response = couple(&meter, candidate).await;

        assert_eq!(response.channel, None);
        assert_eq!(response.probed.len(), 4);
        assert!(response.probed[3].is_empty());
        assert!(meter.lock().unwrap().sets.is_empty());
    }

    #[tokio::test]
    async fn test_decouple_clears_channel() {
        let meter = FakeMeter::shared();
        install(&meter, 2, (10, 0x12345678, 12514, 1, 3));
        let mut device = Device::new("E1");
        let mut holder = connected_holder(meter.clone(), &mut device).await;

        let executor = DecoupleMbusDeviceExecutor::new();
        let request = executor
            .from_bundle_input(BundleAction::DecoupleMbusDevice(DecoupleMbusDeviceRequest { channel: 2 }))
            .unwrap();
        let response = executor.execute(&mut holder, &mut device, request).await.unwrap();

        assert_eq!(response.decoupled.manufacturer_identification, "LGB");
        let meter = meter.lock().unwrap();
        assert_eq!(meter.sets.len(), 5);
        assert_eq!(meter.value(72, mbus_client_setup(2), 6), Some(&DataObject::Unsigned32(0)));
    }

    #[tokio::test]
    async fn test_decouple_rejects_unknown_channel() {
        let meter = FakeMeter::shared();
        let mut device = Device::new("E1");
        let mut holder = connected_holder(meter, &mut device).await;
        let result = DecoupleMbusDeviceExecutor::new()
            .execute(&mut holder, &mut device, DecoupleMbusDeviceRequest { channel: 5 })
            .await;
        assert!(matches!(result, Err(AdapterError::ProtocolAdapter(_))));
    }
}
