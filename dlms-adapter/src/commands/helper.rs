//! Reading typed values out of GET results

use crate::error::{AdapterError, AdapterResult};
use crate::holder::ConnectionHolder;
use dlms_client::{AttributeAddress, GetResult};
use dlms_core::{CosemDateTime, DataObject};

/// GET `addresses` in one request and check that every address got a result
pub(crate) async fn get_with_list(
    holder: &mut ConnectionHolder,
    description: &str,
    addresses: &[AttributeAddress],
) -> AdapterResult<Vec<GetResult>> {
    holder.describe(description);
    log::debug!(
        "{}: {}",
        description,
        addresses.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ")
    );
    let results = holder.get()?.get(addresses).await?;
    if results.len() != addresses.len() {
        return Err(AdapterError::ProtocolAdapter(format!(
            "Expected {} GetResults while trying to {}, got {}",
            addresses.len(),
            description,
            results.len()
        )));
    }
    Ok(results)
}

/// Data of a successful result; `None` when the meter returned null-data
pub(crate) fn read_data<'a>(result: &'a GetResult, description: &str) -> AdapterResult<Option<&'a DataObject>> {
    if !result.result_code.is_success() {
        return Err(AdapterError::ProtocolAdapter(format!(
            "Reading {} failed with result {:?}",
            description, result.result_code
        )));
    }
    Ok(result.result_data.as_ref().filter(|data| !data.is_null()))
}

/// Data of a successful, non-null result
pub(crate) fn read_required<'a>(result: &'a GetResult, description: &str) -> AdapterResult<&'a DataObject> {
    read_data(result, description)?.ok_or_else(|| {
        AdapterError::ProtocolAdapter(format!("Unexpected null value for {}", description))
    })
}

pub(crate) fn read_long(result: &GetResult, description: &str) -> AdapterResult<Option<i64>> {
    read_data(result, description)?
        .map(|data| data.as_long().map_err(|e| protocol_error(description, e)))
        .transpose()
}

pub(crate) fn read_date_time(result: &GetResult, description: &str) -> AdapterResult<Option<CosemDateTime>> {
    read_data(result, description)?
        .map(|data| data.as_date_time().map_err(|e| protocol_error(description, e)))
        .transpose()
}

pub(crate) fn protocol_error(description: &str, error: impl std::fmt::Display) -> AdapterError {
    AdapterError::ProtocolAdapter(format!("Unexpected value for {}: {}", description, error))
}
