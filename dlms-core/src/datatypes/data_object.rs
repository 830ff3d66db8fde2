//! Data object types for DLMS/COSEM protocol

use crate::datatypes::cosem_date_time::CosemDateTime;
use crate::error::{DlmsError, DlmsResult};
use serde::{Deserialize, Serialize};

/// Typed value sent to, or received from, the smart meter
///
/// Profile buffers arrive as an `Array` of `Structure` rows; date-times
/// usually arrive as 12-byte octet strings rather than as `DateTime`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataObject {
    /// Null data
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer 8-bit
    Integer8(i8),
    /// Integer 16-bit
    Integer16(i16),
    /// Integer 32-bit
    Integer32(i32),
    /// Integer 64-bit
    Integer64(i64),
    /// Unsigned integer 8-bit
    Unsigned8(u8),
    /// Unsigned integer 16-bit
    Unsigned16(u16),
    /// Unsigned integer 32-bit
    Unsigned32(u32),
    /// Unsigned integer 64-bit
    Unsigned64(u64),
    /// Enumeration (8-bit)
    Enumerate(u8),
    /// Octet string
    OctetString(Vec<u8>),
    /// Visible string
    VisibleString(Vec<u8>),
    /// Array of DataObjects
    Array(Vec<DataObject>),
    /// Structure (ordered list of DataObjects)
    Structure(Vec<DataObject>),
    /// Date and time
    DateTime(CosemDateTime),
}

impl DataObject {
    /// Check if this is NULL_DATA
    pub fn is_null(&self) -> bool {
        matches!(self, DataObject::Null)
    }

    /// Check if this is any of the integer types
    pub fn is_number(&self) -> bool {
        matches!(
            self,
            DataObject::Integer8(_)
                | DataObject::Integer16(_)
                | DataObject::Integer32(_)
                | DataObject::Integer64(_)
                | DataObject::Unsigned8(_)
                | DataObject::Unsigned16(_)
                | DataObject::Unsigned32(_)
                | DataObject::Unsigned64(_)
                | DataObject::Enumerate(_)
        )
    }

    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            DataObject::Null => "null-data",
            DataObject::Boolean(_) => "boolean",
            DataObject::Integer8(_) => "integer",
            DataObject::Integer16(_) => "long",
            DataObject::Integer32(_) => "double-long",
            DataObject::Integer64(_) => "long64",
            DataObject::Unsigned8(_) => "unsigned",
            DataObject::Unsigned16(_) => "long-unsigned",
            DataObject::Unsigned32(_) => "double-long-unsigned",
            DataObject::Unsigned64(_) => "long64-unsigned",
            DataObject::Enumerate(_) => "enum",
            DataObject::OctetString(_) => "octet-string",
            DataObject::VisibleString(_) => "visible-string",
            DataObject::Array(_) => "array",
            DataObject::Structure(_) => "structure",
            DataObject::DateTime(_) => "date-time",
        }
    }

    /// Widen any integer variant to i64
    ///
    /// Fails for non-integers and for unsigned 64-bit values above `i64::MAX`.
    pub fn as_long(&self) -> DlmsResult<i64> {
        let value = match *self {
            DataObject::Integer8(v) => v as i64,
            DataObject::Integer16(v) => v as i64,
            DataObject::Integer32(v) => v as i64,
            DataObject::Integer64(v) => v,
            DataObject::Unsigned8(v) => v as i64,
            DataObject::Unsigned16(v) => v as i64,
            DataObject::Unsigned32(v) => v as i64,
            DataObject::Enumerate(v) => v as i64,
            DataObject::Unsigned64(v) => i64::try_from(v).map_err(|_| {
                DlmsError::InvalidData(format!("Value {} does not fit in a signed 64-bit long", v))
            })?,
            _ => return Err(self.unexpected("integer")),
        };
        Ok(value)
    }

    /// Integer value narrowed to u8
    pub fn as_unsigned8(&self) -> DlmsResult<u8> {
        let value = self.as_long()?;
        u8::try_from(value)
            .map_err(|_| DlmsError::InvalidData(format!("Value {} out of range for unsigned8", value)))
    }

    /// Integer value narrowed to u16
    pub fn as_unsigned16(&self) -> DlmsResult<u16> {
        let value = self.as_long()?;
        u16::try_from(value)
            .map_err(|_| DlmsError::InvalidData(format!("Value {} out of range for unsigned16", value)))
    }

    /// Integer value narrowed to u32
    pub fn as_unsigned32(&self) -> DlmsResult<u32> {
        let value = self.as_long()?;
        u32::try_from(value)
            .map_err(|_| DlmsError::InvalidData(format!("Value {} out of range for unsigned32", value)))
    }

    /// Get raw bytes of an octet string or visible string
    pub fn as_octet_string(&self) -> DlmsResult<&[u8]> {
        match self {
            DataObject::OctetString(bytes) | DataObject::VisibleString(bytes) => Ok(bytes),
            _ => Err(self.unexpected("octet-string")),
        }
    }

    /// Get the elements of an array or structure
    pub fn as_list(&self) -> DlmsResult<&[DataObject]> {
        match self {
            DataObject::Array(items) | DataObject::Structure(items) => Ok(items),
            _ => Err(self.unexpected("array or structure")),
        }
    }

    /// Interpret this value as a COSEM date-time
    ///
    /// Accepts both the native date-time variant and the 12-byte octet
    /// string encoding meters use inside profile buffers.
    pub fn as_date_time(&self) -> DlmsResult<CosemDateTime> {
        match self {
            DataObject::DateTime(date_time) => Ok(date_time.clone()),
            DataObject::OctetString(bytes) => CosemDateTime::decode(bytes),
            _ => Err(self.unexpected("date-time")),
        }
    }

    fn unexpected(&self, expected: &str) -> DlmsError {
        DlmsError::InvalidData(format!(
            "Expected {}, got {}",
            expected,
            self.type_name()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_long_widens_all_integers() {
        assert_eq!(DataObject::Unsigned32(1234).as_long().unwrap(), 1234);
        assert_eq!(DataObject::Integer8(-3).as_long().unwrap(), -3);
        assert_eq!(DataObject::Enumerate(2).as_long().unwrap(), 2);
        assert!(DataObject::Unsigned64(u64::MAX).as_long().is_err());
        assert!(DataObject::Null.as_long().is_err());
    }

    #[test]
    fn test_narrowing_checks_range() {
        assert_eq!(DataObject::Unsigned16(200).as_unsigned8().unwrap(), 200);
        assert!(DataObject::Unsigned16(300).as_unsigned8().is_err());
        assert!(DataObject::Integer8(-1).as_unsigned16().is_err());
    }

    #[test]
    fn test_as_list_and_octet_string() {
        let row = DataObject::Structure(vec![DataObject::Null, DataObject::Unsigned8(1)]);
        assert_eq!(row.as_list().unwrap().len(), 2);
        assert!(row.as_octet_string().is_err());
        let firmware = DataObject::OctetString(b"V1.2".to_vec());
        assert_eq!(firmware.as_octet_string().unwrap(), b"V1.2");
    }
}
