//! Scaler and unit of a metered value
//!
//! Registers and M-Bus values carry a `scaler_unit` attribute: the raw
//! integer value is multiplied by 10^scaler and expressed in the unit.
//!
//! # Unit Codes
//!
//! Codes follow the DLMS Blue Book unit enumeration; only the units an
//! electricity/gas meter reports are modelled here:
//! - 13: m³
//! - 14: m³ (temperature corrected)
//! - 27: W
//! - 30: Wh
//! - 255: count (no unit)

use crate::datatypes::data_object::DataObject;
use crate::error::{DlmsError, DlmsResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical unit of a scaled value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DlmsUnit {
    CubicMetre = 13,
    CubicMetreCorrected = 14,
    CubicMetrePerHour = 15,
    Watt = 27,
    VoltAmpere = 28,
    Var = 29,
    WattHour = 30,
    VoltAmpereHour = 31,
    VarHour = 32,
    Ampere = 33,
    Volt = 35,
    Hertz = 44,
    Other = 254,
    Count = 255,
}

impl DlmsUnit {
    /// Map a Blue Book unit code; codes outside the supported set are rejected
    pub fn from_code(code: u8) -> DlmsResult<Self> {
        let unit = match code {
            13 => DlmsUnit::CubicMetre,
            14 => DlmsUnit::CubicMetreCorrected,
            15 => DlmsUnit::CubicMetrePerHour,
            27 => DlmsUnit::Watt,
            28 => DlmsUnit::VoltAmpere,
            29 => DlmsUnit::Var,
            30 => DlmsUnit::WattHour,
            31 => DlmsUnit::VoltAmpereHour,
            32 => DlmsUnit::VarHour,
            33 => DlmsUnit::Ampere,
            35 => DlmsUnit::Volt,
            44 => DlmsUnit::Hertz,
            254 => DlmsUnit::Other,
            255 => DlmsUnit::Count,
            _ => {
                return Err(DlmsError::InvalidData(format!(
                    "Unsupported unit code: {}",
                    code
                )))
            }
        };
        Ok(unit)
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            DlmsUnit::CubicMetre | DlmsUnit::CubicMetreCorrected => "m3",
            DlmsUnit::CubicMetrePerHour => "m3/h",
            DlmsUnit::Watt => "W",
            DlmsUnit::VoltAmpere => "VA",
            DlmsUnit::Var => "var",
            DlmsUnit::WattHour => "Wh",
            DlmsUnit::VoltAmpereHour => "VAh",
            DlmsUnit::VarHour => "varh",
            DlmsUnit::Ampere => "A",
            DlmsUnit::Volt => "V",
            DlmsUnit::Hertz => "Hz",
            DlmsUnit::Other => "other",
            DlmsUnit::Count => "",
        }
    }
}

impl fmt::Display for DlmsUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Scaler Unit structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScalerUnit {
    /// Power of ten applied to the raw value
    pub scaler: i8,
    pub unit: DlmsUnit,
}

impl ScalerUnit {
    pub fn new(scaler: i8, unit: DlmsUnit) -> Self {
        Self { scaler, unit }
    }

    /// Apply scaling to a raw register value
    ///
    /// Negative scalers divide instead of multiplying by a fraction so that
    /// e.g. `1234` with scaler -2 yields exactly `12.34`.
    pub fn scale_value(&self, raw: i64) -> f64 {
        let factor = 10_f64.powi(self.scaler.unsigned_abs() as i32);
        if self.scaler < 0 {
            raw as f64 / factor
        } else {
            raw as f64 * factor
        }
    }

    /// Create from the `{scaler: integer, unit: enum}` structure a meter returns
    pub fn from_data_object(obj: &DataObject) -> DlmsResult<Self> {
        let fields = obj.as_list()?;
        if fields.len() != 2 {
            return Err(DlmsError::InvalidData(format!(
                "Scaler unit structure must have 2 elements, got {}",
                fields.len()
            )));
        }
        let scaler = i8::try_from(fields[0].as_long()?)
            .map_err(|_| DlmsError::InvalidData("Scaler out of range".to_string()))?;
        let unit = DlmsUnit::from_code(fields[1].as_unsigned8()?)?;
        Ok(Self::new(scaler, unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_scaler_divides() {
        let scaler_unit = ScalerUnit::new(-2, DlmsUnit::CubicMetre);
        assert_eq!(scaler_unit.scale_value(1234), 12.34);
        assert_eq!(scaler_unit.unit.to_string(), "m3");
    }

    #[test]
    fn test_positive_scaler_multiplies() {
        let scaler_unit = ScalerUnit::new(3, DlmsUnit::Watt);
        assert_eq!(scaler_unit.scale_value(12), 12000.0);
    }

    #[test]
    fn test_from_data_object() {
        let obj = DataObject::Structure(vec![DataObject::Integer8(-3), DataObject::Enumerate(13)]);
        let scaler_unit = ScalerUnit::from_data_object(&obj).unwrap();
        assert_eq!(scaler_unit, ScalerUnit::new(-3, DlmsUnit::CubicMetre));

        let unsupported = DataObject::Structure(vec![DataObject::Integer8(0), DataObject::Enumerate(99)]);
        assert!(ScalerUnit::from_data_object(&unsupported).is_err());
    }
}
