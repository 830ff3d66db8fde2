//! Encodings of the M-Bus client setup identification attributes

use crate::error::{AdapterError, AdapterResult};
use dlms_core::DataObject;

/// M-Bus identification number, 8 BCD digits in a double-long-unsigned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentificationNumber(u32);

impl IdentificationNumber {
    /// Parse up to 8 decimal digits; an empty string is the empty sentinel
    pub fn from_last_8_digits(digits: &str) -> AdapterResult<Self> {
        if digits.len() > 8 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(AdapterError::ProtocolAdapter(format!(
                "Identification number must be at most 8 digits: {:?}",
                digits
            )));
        }
        let bcd = digits
            .bytes()
            .fold(0u32, |acc, digit| (acc << 4) | u32::from(digit - b'0'));
        Ok(Self(bcd))
    }

    pub fn from_identification(identification: u32) -> AdapterResult<Self> {
        let mut remaining = identification;
        for _ in 0..8 {
            if remaining & 0x0F > 9 {
                return Err(AdapterError::ProtocolAdapter(format!(
                    "Identification number {:#010X} is not BCD encoded",
                    identification
                )));
            }
            remaining >>= 4;
        }
        Ok(Self(identification))
    }

    pub fn identification(&self) -> u32 {
        self.0
    }

    pub fn last_8_digits(&self) -> String {
        format!("{:08X}", self.0)
    }

    pub fn as_data_object(&self) -> DataObject {
        DataObject::Unsigned32(self.0)
    }
}

/// Three-letter manufacturer flag, 5 bits per letter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManufacturerId {
    identification: String,
    id: u16,
}

impl ManufacturerId {
    pub fn from_identification(identification: &str) -> AdapterResult<Self> {
        if identification.is_empty() {
            return Ok(Self {
                identification: String::new(),
                id: 0,
            });
        }
        let letters = identification.as_bytes();
        if letters.len() != 3 || !letters.iter().all(|c| c.is_ascii_uppercase()) {
            return Err(AdapterError::ProtocolAdapter(format!(
                "Manufacturer identification must be three uppercase letters: {:?}",
                identification
            )));
        }
        let id = letters
            .iter()
            .fold(0u16, |acc, letter| (acc << 5) | u16::from(letter - 64));
        Ok(Self {
            identification: identification.to_string(),
            id,
        })
    }

    pub fn from_id(id: u16) -> AdapterResult<Self> {
        if id == 0 {
            return Ok(Self {
                identification: String::new(),
                id,
            });
        }
        let mut identification = String::with_capacity(3);
        for shift in [10u16, 5, 0] {
            let code = ((id >> shift) & 0x1F) as u8;
            if !(1..=26).contains(&code) {
                return Err(AdapterError::ProtocolAdapter(format!(
                    "Manufacturer id {} does not encode three letters",
                    id
                )));
            }
            identification.push(char::from(code + 64));
        }
        Ok(Self { identification, id })
    }

    pub fn identification(&self) -> &str {
        &self.identification
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn as_data_object(&self) -> DataObject {
        DataObject::Unsigned16(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manufacturer_id() {
        assert_eq!(ManufacturerId::from_identification("LGB").unwrap().id(), 12514);
        assert_eq!(ManufacturerId::from_id(12514).unwrap().identification(), "LGB");
        assert_eq!(ManufacturerId::from_id(0).unwrap().identification(), "");
        assert!(ManufacturerId::from_identification("lgb").is_err());
        assert!(ManufacturerId::from_id(0x7FFF).is_err());
    }

    #[test]
    fn test_identification_number() {
        let number = IdentificationNumber::from_last_8_digits("12345678").unwrap();
        assert_eq!(number.identification(), 0x12345678);
        assert_eq!(
            IdentificationNumber::from_identification(0x12345678).unwrap().last_8_digits(),
            "12345678"
        );
        assert_eq!(IdentificationNumber::from_last_8_digits("42").unwrap().last_8_digits(), "00000042");
        assert!(IdentificationNumber::from_identification(0x1234567A).is_err());
        assert!(IdentificationNumber::from_last_8_digits("123456789").is_err());
    }
}
