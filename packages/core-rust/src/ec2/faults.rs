//! Typed EC2 fault details.
//!
//! Every field defaults so a fault without a detail payload still maps to
//! its typed variant.

use serde::{Deserialize, Serialize};

pub const AUTH_FAILURE: &str = "AuthFailure";
pub const REQUEST_LIMIT_EXCEEDED: &str = "RequestLimitExceeded";
pub const UNAUTHORIZED_OPERATION: &str = "UnauthorizedOperation";
pub const DRY_RUN_OPERATION: &str = "DryRunOperation";
pub const INVALID_PARAMETER_VALUE: &str = "InvalidParameterValue";
pub const INCORRECT_INSTANCE_STATE: &str = "IncorrectInstanceState";
pub const INVALID_INSTANCE_ID_NOT_FOUND: &str = "InvalidInstanceID.NotFound";

/// Credentials were missing, expired, or did not verify.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// The caller is being throttled.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestLimitExceeded {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UnauthorizedOperation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoded_message: Option<String>,
}

/// Returned instead of performing a call made with `dryRun` set, when the
/// caller would have been allowed to perform it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DryRunOperation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InvalidParameterValue {
    pub parameter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// The instance is not in a state that allows the requested transition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IncorrectInstanceState {
    pub instance_id: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InvalidInstanceIdNotFound {
    pub instance_ids: Vec<String>,
}
