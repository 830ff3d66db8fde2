//! Core types and utilities for DLMS/COSEM protocol
//!
//! This crate provides the value model shared by the client boundary and the
//! protocol adapter: OBIS codes, data objects as returned by GET requests,
//! COSEM date-times and scaler/unit pairs.

pub mod error;
pub mod obis_code;
pub mod datatypes;

pub use error::{DlmsError, DlmsResult};
pub use obis_code::ObisCode;
pub use datatypes::{CosemDateTime, DataObject, DlmsUnit, ScalerUnit};
