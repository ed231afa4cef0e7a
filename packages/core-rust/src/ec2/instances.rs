use serde::{Deserialize, Serialize};

use super::faults::{
    IncorrectInstanceState, InvalidInstanceIdNotFound, INCORRECT_INSTANCE_STATE,
    INVALID_INSTANCE_ID_NOT_FOUND,
};
use crate::descriptor::Operation;
use crate::fault::{FaultTable, FaultType};

fn instance_faults() -> FaultTable {
    FaultTable::new()
        .with(FaultType::of::<IncorrectInstanceState>(
            INCORRECT_INSTANCE_STATE,
        ))
        .with(FaultType::of::<InvalidInstanceIdNotFound>(
            INVALID_INSTANCE_ID_NOT_FOUND,
        ))
}

// ---------------------------------------------------------------------------
// Instance state
// ---------------------------------------------------------------------------

/// EC2 instance state. `code` uses the low byte of the service's state code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceState {
    pub code: u16,
    pub name: String,
}

impl InstanceState {
    #[must_use]
    pub fn pending() -> Self {
        Self::named(0, "pending")
    }

    #[must_use]
    pub fn running() -> Self {
        Self::named(16, "running")
    }

    #[must_use]
    pub fn stopping() -> Self {
        Self::named(64, "stopping")
    }

    #[must_use]
    pub fn stopped() -> Self {
        Self::named(80, "stopped")
    }

    fn named(code: u16, name: &str) -> Self {
        Self {
            code,
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStateChange {
    pub instance_id: String,
    pub current_state: InstanceState,
    pub previous_state: InstanceState,
}

// ---------------------------------------------------------------------------
// StartInstances
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct StartInstances;

impl Operation for StartInstances {
    const NAME: &'static str = "StartInstances";
    const ACTION: &'static str = "http://ec2.amazonaws.com/doc/2016-11-15/StartInstances";
    type Request = StartInstancesRequest;
    type Response = StartInstancesResponse;

    fn faults() -> FaultTable {
        instance_faults()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartInstancesRequest {
    pub instance_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub additional_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dry_run: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartInstancesResponse {
    pub request_id: String,
    #[serde(default)]
    pub starting_instances: Vec<InstanceStateChange>,
}

// ---------------------------------------------------------------------------
// StopInstances
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct StopInstances;

impl Operation for StopInstances {
    const NAME: &'static str = "StopInstances";
    const ACTION: &'static str = "http://ec2.amazonaws.com/doc/2016-11-15/StopInstances";
    type Request = StopInstancesRequest;
    type Response = StopInstancesResponse;

    fn faults() -> FaultTable {
        instance_faults()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopInstancesRequest {
    pub instance_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub force: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hibernate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dry_run: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopInstancesResponse {
    pub request_id: String,
    #[serde(default)]
    pub stopping_instances: Vec<InstanceStateChange>,
}
