//! A representative slice of the Amazon EC2 API expressed as `Operation`s.
//!
//! Only a handful of operations are declared; the full WSDL surface follows
//! the same pattern (one marker type, one request, one response, optional
//! operation-specific faults).

pub mod faults;
pub mod instances;
pub mod regions;

pub use faults::{
    AuthFailure, DryRunOperation, IncorrectInstanceState, InvalidInstanceIdNotFound,
    InvalidParameterValue, RequestLimitExceeded, UnauthorizedOperation,
};
pub use instances::{
    InstanceState, InstanceStateChange, StartInstances, StartInstancesRequest,
    StartInstancesResponse, StopInstances, StopInstancesRequest, StopInstancesResponse,
};
pub use regions::{
    AvailabilityZone, DescribeAvailabilityZones, DescribeAvailabilityZonesRequest,
    DescribeAvailabilityZonesResponse, DescribeRegions, DescribeRegionsRequest,
    DescribeRegionsResponse, RegionInfo,
};

use crate::fault::{FaultTable, FaultType};
use crate::registry::{OperationRegistry, RegistryBuilder, RegistryError};

/// Namespace every EC2 action URI lives under.
pub const NAMESPACE: &str = "http://ec2.amazonaws.com/doc/2016-11-15/";

/// Registers every operation in this module.
///
/// # Errors
///
/// Propagates `RegistryError` if any operation is already present in
/// `builder`.
pub fn register_all(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder
        .register_operation::<DescribeRegions>()?
        .register_operation::<DescribeAvailabilityZones>()?
        .register_operation::<StartInstances>()?
        .register_operation::<StopInstances>()?;
    Ok(())
}

/// A registry containing exactly the operations in this module.
///
/// # Errors
///
/// Never fails in practice; the `Result` mirrors `register_all`.
pub fn registry() -> Result<OperationRegistry, RegistryError> {
    let mut builder = RegistryBuilder::new();
    register_all(&mut builder)?;
    Ok(builder.build())
}

/// Faults any EC2 operation may return.
#[must_use]
pub fn common_faults() -> FaultTable {
    FaultTable::new()
        .with(FaultType::of::<AuthFailure>(faults::AUTH_FAILURE))
        .with(
            FaultType::of::<RequestLimitExceeded>(faults::REQUEST_LIMIT_EXCEEDED).retryable(),
        )
        .with(FaultType::of::<UnauthorizedOperation>(
            faults::UNAUTHORIZED_OPERATION,
        ))
        .with(FaultType::of::<DryRunOperation>(faults::DRY_RUN_OPERATION))
        .with(FaultType::of::<InvalidParameterValue>(
            faults::INVALID_PARAMETER_VALUE,
        ))
}
