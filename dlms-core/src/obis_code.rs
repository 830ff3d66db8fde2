use crate::error::{DlmsError, DlmsResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `A-B:C.D.E*F`, `A-B:C.D.E.F` or `A-B:C.D.E` (F defaults to 255)
static EXTENDED_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,3})-(\d{1,3}):(\d{1,3})\.(\d{1,3})\.(\d{1,3})(?:[.*](\d{1,3}))?$")
        .expect("static OBIS pattern is valid")
});

/// OBIS (Object Identification System) code for identifying COSEM objects
///
/// OBIS codes are 6-byte identifiers used in DLMS/COSEM to uniquely identify
/// objects in a logical device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObisCode {
    bytes: [u8; 6],
}

impl ObisCode {
    /// Create a new OBIS code from its six value groups
    pub const fn new(a: u8, b: u8, c: u8, d: u8, e: u8, f: u8) -> Self {
        Self {
            bytes: [a, b, c, d, e, f],
        }
    }

    /// Parse an OBIS code from string format
    ///
    /// Supports formats like:
    /// - "1.0.1.8.0.255"
    /// - "0-1:24.2.1.255"
    /// - "1-0:99.2.0*255"
    pub fn from_string(s: &str) -> DlmsResult<Self> {
        let s = s.trim();
        if let Ok(code) = Self::parse_dot_format(s) {
            return Ok(code);
        }
        if let Ok(code) = Self::parse_extended_format(s) {
            return Ok(code);
        }
        Err(DlmsError::InvalidData(format!("Invalid OBIS code format: {}", s)))
    }

    fn parse_dot_format(s: &str) -> DlmsResult<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 6 {
            return Err(DlmsError::InvalidData("Expected 6 dot-separated values".to_string()));
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            bytes[i] = Self::parse_group(part)?;
        }
        Ok(Self { bytes })
    }

    fn parse_extended_format(s: &str) -> DlmsResult<Self> {
        let captures = EXTENDED_FORMAT
            .captures(s)
            .ok_or_else(|| DlmsError::InvalidData(format!("Not an extended OBIS code: {}", s)))?;

        let mut bytes = [255u8; 6];
        for (i, byte) in bytes.iter_mut().enumerate() {
            if let Some(group) = captures.get(i + 1) {
                *byte = Self::parse_group(group.as_str())?;
            }
        }
        Ok(Self { bytes })
    }

    fn parse_group(part: &str) -> DlmsResult<u8> {
        part.parse::<u8>()
            .map_err(|_| DlmsError::InvalidData(format!("Invalid byte value: {}", part)))
    }

    /// Get the OBIS code as a byte array
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.bytes
    }

    /// Get the B value, which selects the M-Bus channel on channel-scoped objects
    pub fn b(&self) -> u8 {
        self.bytes[1]
    }
}

impl FromStr for ObisCode {
    type Err = DlmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

impl fmt::Display for ObisCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}.{}.{}",
            self.bytes[0], self.bytes[1], self.bytes[2],
            self.bytes[3], self.bytes[4], self.bytes[5]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obis_code_from_dot_string() {
        let code = ObisCode::from_string("1.0.99.2.0.255").unwrap();
        assert_eq!(code, ObisCode::new(1, 0, 99, 2, 0, 255));
    }

    #[test]
    fn test_obis_code_from_extended_string() {
        let code: ObisCode = "0-1:24.2.1.255".parse().unwrap();
        assert_eq!(code, ObisCode::new(0, 1, 24, 2, 1, 255));
        assert_eq!(code.b(), 1);

        let starred = ObisCode::from_string("1-0:99.2.0*255").unwrap();
        assert_eq!(starred, ObisCode::new(1, 0, 99, 2, 0, 255));

        let short = ObisCode::from_string("0-0:96.1.0").unwrap();
        assert_eq!(short, ObisCode::new(0, 0, 96, 1, 0, 255));
    }

    #[test]
    fn test_extended_format_pattern_compiles() {
        let pattern = Lazy::force(&EXTENDED_FORMAT);
        assert_eq!(pattern.captures_len(), 7);
    }

    #[test]
    fn test_obis_code_rejects_garbage() {
        assert!(ObisCode::from_string("1.2.3").is_err());
        assert!(ObisCode::from_string("0-1:24.2.300.255").is_err());
    }

    #[test]
    fn test_obis_code_display() {
        let code = ObisCode::new(0, 3, 24, 3, 0, 255);
        assert_eq!(format!("{}", code), "0.3.24.3.0.255");
    }
}
