//! Selective access descriptors
//!
//! Profile Generic buffers can be read with access selector 1 (range
//! descriptor): a restricting capture object, a from/to value range and an
//! optional list of selected columns. An empty column list selects all
//! columns.

use dlms_core::{CosemDateTime, DataObject, ObisCode};
use serde::{Deserialize, Serialize};

/// Access selector of a range descriptor
pub const SELECTOR_RANGE_DESCRIPTOR: u8 = 1;

/// Column (capture object) of a profile buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureObjectDefinition {
    pub class_id: u16,
    pub obis_code: ObisCode,
    pub attribute_index: i8,
    pub data_index: u16,
}

impl CaptureObjectDefinition {
    pub const fn new(class_id: u16, obis_code: ObisCode, attribute_index: i8) -> Self {
        Self {
            class_id,
            obis_code,
            attribute_index,
            data_index: 0,
        }
    }

    /// `{class_id, logical_name, attribute_index, data_index}` structure
    pub fn to_data_object(&self) -> DataObject {
        DataObject::Structure(vec![
            DataObject::Unsigned16(self.class_id),
            DataObject::OctetString(self.obis_code.as_bytes().to_vec()),
            DataObject::Integer8(self.attribute_index),
            DataObject::Unsigned16(self.data_index),
        ])
    }
}

/// Access selector plus its parameter structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectiveAccessDescription {
    pub selector: u8,
    pub parameter: DataObject,
}

impl SelectiveAccessDescription {
    /// Range descriptor restricting rows by clock and optionally selecting columns
    pub fn range(
        restricting_object: CaptureObjectDefinition,
        from: &CosemDateTime,
        to: &CosemDateTime,
        selected_values: &[CaptureObjectDefinition],
    ) -> Self {
        let parameter = DataObject::Structure(vec![
            restricting_object.to_data_object(),
            DataObject::OctetString(from.encode()),
            DataObject::OctetString(to.encode()),
            DataObject::Array(selected_values.iter().map(|column| column.to_data_object()).collect()),
        ]);
        Self {
            selector: SELECTOR_RANGE_DESCRIPTOR,
            parameter,
        }
    }

    /// Number of explicitly selected columns; zero means all columns
    pub fn selected_column_count(&self) -> usize {
        self.parameter
            .as_list()
            .ok()
            .and_then(|fields| fields.get(3))
            .and_then(|columns| columns.as_list().ok())
            .map_or(0, |columns| columns.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const CLOCK: CaptureObjectDefinition = CaptureObjectDefinition::new(8, ObisCode::new(0, 0, 1, 0, 0, 255), 2);

    #[test]
    fn test_range_descriptor_layout() {
        let from = CosemDateTime::from_utc(&Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let to = CosemDateTime::from_utc(&Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
        let value = CaptureObjectDefinition::new(4, ObisCode::new(0, 1, 24, 2, 1, 255), 2);
        let descriptor = SelectiveAccessDescription::range(CLOCK, &from, &to, &[CLOCK, value]);

        assert_eq!(descriptor.selector, SELECTOR_RANGE_DESCRIPTOR);
        assert_eq!(descriptor.selected_column_count(), 2);
        let fields = descriptor.parameter.as_list().unwrap();
        assert_eq!(fields[1], DataObject::OctetString(from.encode()));
    }

    #[test]
    fn test_empty_selection_means_all_columns() {
        let instant = CosemDateTime::from_utc(&Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let descriptor = SelectiveAccessDescription::range(CLOCK, &instant, &instant, &[]);
        assert_eq!(descriptor.selected_column_count(), 0);
    }
}
