//! Request parameters and results of the GET/SET/ACTION services

use crate::selective_access::SelectiveAccessDescription;
use dlms_core::{DataObject, ObisCode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of one attribute of a COSEM object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeAddress {
    pub class_id: u16,
    pub obis_code: ObisCode,
    pub attribute_id: i8,
    /// Selective access descriptor (profile buffers only)
    pub access_selection: Option<SelectiveAccessDescription>,
}

impl AttributeAddress {
    pub fn new(class_id: u16, obis_code: ObisCode, attribute_id: i8) -> Self {
        Self {
            class_id,
            obis_code,
            attribute_id,
            access_selection: None,
        }
    }

    pub fn with_access_selection(mut self, access_selection: SelectiveAccessDescription) -> Self {
        self.access_selection = Some(access_selection);
        self
    }
}

impl fmt::Display for AttributeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{},{},{}}}", self.class_id, self.obis_code, self.attribute_id)?;
        if self.access_selection.is_some() {
            write!(f, " with selective access")?;
        }
        Ok(())
    }
}

/// Parameter of a SET request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetParameter {
    pub address: AttributeAddress,
    pub value: DataObject,
}

impl SetParameter {
    pub fn new(address: AttributeAddress, value: DataObject) -> Self {
        Self { address, value }
    }
}

/// Parameter of an ACTION request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodParameter {
    pub class_id: u16,
    pub obis_code: ObisCode,
    pub method_id: i8,
    pub parameter: Option<DataObject>,
}

impl MethodParameter {
    pub fn new(class_id: u16, obis_code: ObisCode, method_id: i8, parameter: Option<DataObject>) -> Self {
        Self {
            class_id,
            obis_code,
            method_id,
            parameter,
        }
    }
}

/// Data access result of a GET or SET
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessResultCode {
    Success,
    HardwareFault,
    TemporaryFailure,
    ReadWriteDenied,
    ObjectUndefined,
    ObjectClassInconsistent,
    ObjectUnavailable,
    TypeUnmatched,
    ScopeOfAccessViolated,
    DataBlockUnavailable,
    LongGetAborted,
    NoLongGetInProgress,
    LongSetAborted,
    NoLongSetInProgress,
    DataBlockNumberInvalid,
    OtherReason,
}

impl AccessResultCode {
    pub fn is_success(&self) -> bool {
        matches!(self, AccessResultCode::Success)
    }
}

/// Result of an ACTION
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodResultCode {
    Success,
    HardwareFault,
    TemporaryFailure,
    ReadWriteDenied,
    ObjectUndefined,
    ObjectClassInconsistent,
    ObjectUnavailable,
    TypeUnmatched,
    ScopeOfAccessViolated,
    DataBlockUnavailable,
    LongActionAborted,
    NoLongActionInProgress,
    OtherReason,
}

impl MethodResultCode {
    pub fn is_success(&self) -> bool {
        matches!(self, MethodResultCode::Success)
    }
}

/// One result of a GET request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetResult {
    pub result_code: AccessResultCode,
    /// Present when `result_code` is `Success`
    pub result_data: Option<DataObject>,
}

impl GetResult {
    pub fn success(data: DataObject) -> Self {
        Self {
            result_code: AccessResultCode::Success,
            result_data: Some(data),
        }
    }

    pub fn failure(result_code: AccessResultCode) -> Self {
        Self {
            result_code,
            result_data: None,
        }
    }
}

/// Result of an ACTION request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResult {
    pub result_code: MethodResultCode,
    pub return_data: Option<DataObject>,
}

impl MethodResult {
    pub fn success() -> Self {
        Self {
            result_code: MethodResultCode::Success,
            return_data: None,
        }
    }
}
