//! DLMS/COSEM client boundary
//!
//! This crate describes the library-level client the protocol adapter talks
//! to: GET/SET/ACTION services addressed by class id, OBIS code and
//! attribute (or method) id, optional selective access, client-side key
//! changes, and a factory that opens an association for a security suite.
//! The APDU encoding itself lives behind these traits.

pub mod connection;
pub mod listener;
pub mod request;
pub mod selective_access;

pub use connection::{ConnectionBuilder, ConnectionFactory, ConnectionSettings, DlmsConnection};
pub use listener::{DlmsMessageListener, MessageDirection, NoopMessageListener, RawMessageData};
pub use request::{
    AccessResultCode, AttributeAddress, GetResult, MethodParameter, MethodResult, MethodResultCode,
    SetParameter,
};
pub use selective_access::{CaptureObjectDefinition, SelectiveAccessDescription};
