//! Connection trait for DLMS/COSEM client operations
//!
//! An open [`DlmsConnection`] is an established, secured association with
//! one meter. Implementations own the transport; dropping or closing the
//! connection releases it.

use crate::request::{AttributeAddress, GetResult, MethodParameter, MethodResult, SetParameter, AccessResultCode};
use dlms_core::DlmsResult;

/// Connection trait for DLMS/COSEM client operations
///
/// # Error Handling
/// Transport failures surface as [`dlms_core::DlmsError::Connection`] or
/// [`dlms_core::DlmsError::Timeout`]; a meter refusing a request is reported
/// through the result codes, not as an error.
#[async_trait::async_trait]
pub trait DlmsConnection: Send {
    /// GET one or more attributes
    ///
    /// A single address is sent as GET-Request-Normal, several as
    /// GET-Request-With-List. One result is returned per address, in order.
    async fn get(&mut self, addresses: &[AttributeAddress]) -> DlmsResult<Vec<GetResult>>;

    /// SET a single attribute
    async fn set(&mut self, parameter: SetParameter) -> DlmsResult<AccessResultCode>;

    /// Invoke a method (ACTION)
    async fn action(&mut self, parameter: MethodParameter) -> DlmsResult<MethodResult>;

    /// Switch the client's own authentication key for the rest of the session
    async fn change_client_global_authentication_key(&mut self, key: &[u8]) -> DlmsResult<()>;

    /// Switch the client's own global unicast encryption key for the rest of the session
    async fn change_client_global_encryption_key(&mut self, key: &[u8]) -> DlmsResult<()>;

    /// Release the transport without sending a release request to the meter
    async fn close(&mut self) -> DlmsResult<()>;
}
