//! COSEM DateTime type for DLMS/COSEM protocol

use crate::error::{DlmsError, DlmsResult};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const YEAR_NOT_SPECIFIED: u16 = 0xffff;
const BYTE_NOT_SPECIFIED: u8 = 0xff;
const DEVIATION_NOT_SPECIFIED: i16 = i16::MIN;

/// Clock status flags for COSEM DateTime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockStatus {
    InvalidValue = 0x01,
    DoubtfulValue = 0x02,
    DifferentClockBase = 0x04,
    InvalidClockStatus = 0x08,
    DaylightSavingActive = 0x80,
}

impl ClockStatus {
    const ALL: [ClockStatus; 5] = [
        ClockStatus::InvalidValue,
        ClockStatus::DoubtfulValue,
        ClockStatus::DifferentClockBase,
        ClockStatus::InvalidClockStatus,
        ClockStatus::DaylightSavingActive,
    ];

    /// Parse clock status from a byte
    pub fn from_byte(byte: u8) -> Vec<ClockStatus> {
        Self::ALL
            .into_iter()
            .filter(|status| byte & *status as u8 != 0)
            .collect()
    }
}

/// Class representing a COSEM DateTime
///
/// Every field can carry the "not specified" wildcard, which is how meters
/// report empty capture slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosemDateTime {
    year: u16,
    month: u8,
    day_of_month: u8,
    day_of_week: u8,
    hour: u8,
    minute: u8,
    second: u8,
    hundredths: u8,
    deviation: i16,
    clock_status: u8,
}

impl CosemDateTime {
    pub const LENGTH: usize = 12;

    /// A date-time with every field set to "not specified"
    pub fn unspecified() -> Self {
        Self {
            year: YEAR_NOT_SPECIFIED,
            month: BYTE_NOT_SPECIFIED,
            day_of_month: BYTE_NOT_SPECIFIED,
            day_of_week: BYTE_NOT_SPECIFIED,
            hour: BYTE_NOT_SPECIFIED,
            minute: BYTE_NOT_SPECIFIED,
            second: BYTE_NOT_SPECIFIED,
            hundredths: BYTE_NOT_SPECIFIED,
            deviation: DEVIATION_NOT_SPECIFIED,
            clock_status: BYTE_NOT_SPECIFIED,
        }
    }

    /// Build a fully specified date-time from a UTC instant (deviation 0)
    pub fn from_utc(instant: &DateTime<Utc>) -> Self {
        Self {
            year: instant.year() as u16,
            month: instant.month() as u8,
            day_of_month: instant.day() as u8,
            day_of_week: instant.weekday().number_from_monday() as u8,
            hour: instant.hour() as u8,
            minute: instant.minute() as u8,
            second: instant.second() as u8,
            hundredths: (instant.nanosecond() / 10_000_000).min(99) as u8,
            deviation: 0,
            clock_status: 0,
        }
    }

    /// Decode a COSEM DateTime from its 12-byte octet string
    pub fn decode(octet_string: &[u8]) -> DlmsResult<Self> {
        if octet_string.len() != Self::LENGTH {
            return Err(DlmsError::InvalidData(format!(
                "Array has an invalid length. Expected {}, got {}",
                Self::LENGTH,
                octet_string.len()
            )));
        }

        Ok(Self {
            year: u16::from_be_bytes([octet_string[0], octet_string[1]]),
            month: octet_string[2],
            day_of_month: octet_string[3],
            day_of_week: octet_string[4],
            hour: octet_string[5],
            minute: octet_string[6],
            second: octet_string[7],
            hundredths: octet_string[8],
            deviation: i16::from_be_bytes([octet_string[9], octet_string[10]]),
            clock_status: octet_string[11],
        })
    }

    /// Encode to the 12-byte octet string representation
    pub fn encode(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(Self::LENGTH);
        result.extend_from_slice(&self.year.to_be_bytes());
        result.extend_from_slice(&[
            self.month,
            self.day_of_month,
            self.day_of_week,
            self.hour,
            self.minute,
            self.second,
            self.hundredths,
        ]);
        result.extend_from_slice(&self.deviation.to_be_bytes());
        result.push(self.clock_status);
        result
    }

    /// Whether date and time of day are all concrete values
    pub fn is_date_time_specified(&self) -> bool {
        self.year != YEAR_NOT_SPECIFIED
            && (1..=12).contains(&self.month)
            && (1..=31).contains(&self.day_of_month)
            && self.hour <= 23
            && self.minute <= 59
            && self.second <= 59
    }

    /// Convert to a UTC instant
    ///
    /// Returns `None` when any date or time field is unspecified. An
    /// unspecified deviation is read as UTC.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        if !self.is_date_time_specified() {
            return None;
        }
        let millis = if self.hundredths < 100 {
            self.hundredths as u32 * 10
        } else {
            0
        };
        let local = NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day_of_month as u32)?
            .and_hms_milli_opt(self.hour as u32, self.minute as u32, self.second as u32, millis)?;
        let naive_utc = if self.deviation == DEVIATION_NOT_SPECIFIED {
            local
        } else {
            local + Duration::minutes(self.deviation as i64)
        };
        Some(Utc.from_utc_datetime(&naive_utc))
    }

    /// Get the clock status flags
    pub fn clock_status(&self) -> Vec<ClockStatus> {
        if self.clock_status == BYTE_NOT_SPECIFIED {
            return Vec::new();
        }
        ClockStatus::from_byte(self.clock_status)
    }
}

impl fmt::Display for CosemDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_utc() {
            Some(instant) => write!(f, "{}", instant.to_rfc3339()),
            None => write!(f, "<unspecified {:02x?}>", self.encode()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosem_date_time_decode() {
        let bytes = [
            0x07, 0xE8, 0x01, 0x0F, 0x01, // Date: 2024-01-15, Monday
            0x0E, 0x1E, 0x2D, 0x00,       // Time: 14:30:45.00
            0x00, 0x00,                   // Deviation: 0
            0x00,                         // Clock status: 0
        ];
        let dt = CosemDateTime::decode(&bytes).unwrap();
        assert!(dt.is_date_time_specified());
        let utc = dt.to_utc().unwrap();
        assert_eq!(utc, Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 45).unwrap());
        assert_eq!(dt.encode(), bytes.to_vec());
    }

    #[test]
    fn test_deviation_shifts_to_utc() {
        let mut bytes = CosemDateTime::from_utc(&Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()).encode();
        // local time is UTC+2: deviation -120 minutes
        bytes[9..11].copy_from_slice(&(-120i16).to_be_bytes());
        let dt = CosemDateTime::decode(&bytes).unwrap();
        assert_eq!(dt.to_utc().unwrap(), Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_unspecified_has_no_instant() {
        let dt = CosemDateTime::unspecified();
        assert!(!dt.is_date_time_specified());
        assert!(dt.to_utc().is_none());
        assert!(dt.clock_status().is_empty());
        assert_eq!(CosemDateTime::decode(&dt.encode()).unwrap(), dt);
    }

    #[test]
    fn test_invalid_length() {
        assert!(CosemDateTime::decode(&[0u8; 5]).is_err());
    }
}
