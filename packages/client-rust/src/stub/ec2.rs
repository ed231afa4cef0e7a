//! In-memory emulation of the EC2 operations in `wirecall_core::ec2`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::http::StatusCode;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use wirecall_core::ec2::faults::{
    DRY_RUN_OPERATION, INCORRECT_INSTANCE_STATE, INVALID_INSTANCE_ID_NOT_FOUND,
    INVALID_PARAMETER_VALUE,
};
use wirecall_core::ec2::{
    AvailabilityZone, DescribeAvailabilityZones, DescribeAvailabilityZonesRequest,
    DescribeAvailabilityZonesResponse, DescribeRegions, DescribeRegionsRequest,
    DescribeRegionsResponse, DryRunOperation, IncorrectInstanceState, InstanceState,
    InstanceStateChange, InvalidInstanceIdNotFound, InvalidParameterValue, RegionInfo,
    StartInstances, StartInstancesRequest, StartInstancesResponse, StopInstances,
    StopInstancesRequest, StopInstancesResponse,
};
use wirecall_core::{FaultEnvelope, Operation, RequestEnvelope, WireCodec};

/// Regions known to the stub, in listing order, with their opt-in status.
const REGIONS: &[(&str, &str)] = &[
    ("us-east-1", "opt-in-not-required"),
    ("us-west-2", "opt-in-not-required"),
    ("eu-west-1", "opt-in-not-required"),
    ("ap-southeast-2", "opt-in-not-required"),
    ("af-south-1", "not-opted-in"),
];

const ZONES_PER_REGION: u8 = 3;

/// A fault the stub answers with, plus the HTTP status it travels on.
#[derive(Debug, Clone)]
pub struct StubFault {
    pub status: StatusCode,
    pub fault: FaultEnvelope,
}

impl StubFault {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            fault: FaultEnvelope::new(code, message),
        }
    }

    /// Attaches a detail payload. A detail that cannot be encoded is dropped.
    #[must_use]
    pub fn with_detail<D: Serialize>(mut self, detail: &D) -> Self {
        match WireCodec.detail(detail) {
            Ok(value) => self.fault = self.fault.with_detail(value),
            Err(err) => debug!(code = %self.fault.code, error = %err, "dropping fault detail"),
        }
        self
    }

    fn invalid_parameter(parameter: &str, value: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, INVALID_PARAMETER_VALUE, message).with_detail(
            &InvalidParameterValue {
                parameter: parameter.to_string(),
                value: value.map(str::to_string),
            },
        )
    }

    fn dry_run(request_id: String) -> Self {
        Self::new(
            StatusCode::PRECONDITION_FAILED,
            DRY_RUN_OPERATION,
            "Request would have succeeded, but DryRun flag is set.",
        )
        .with_detail(&DryRunOperation {
            request_id: Some(request_id),
        })
    }
}

// ---------------------------------------------------------------------------
// Ec2Service
// ---------------------------------------------------------------------------

/// Regions are static; instances live in a mutable fleet so state changes
/// are visible to later calls.
#[derive(Debug)]
pub struct Ec2Service {
    fleet: Mutex<BTreeMap<String, InstanceState>>,
    next_request: AtomicU64,
}

impl Default for Ec2Service {
    fn default() -> Self {
        Self::with_instances([
            ("i-0123456789abcdef0", InstanceState::running()),
            ("i-0fedcba9876543210", InstanceState::stopped()),
        ])
    }
}

impl Ec2Service {
    pub fn with_instances<I, S>(instances: I) -> Self
    where
        I: IntoIterator<Item = (S, InstanceState)>,
        S: Into<String>,
    {
        Self {
            fleet: Mutex::new(
                instances
                    .into_iter()
                    .map(|(id, state)| (id.into(), state))
                    .collect(),
            ),
            next_request: AtomicU64::new(1),
        }
    }

    /// Current state of an instance, if it exists.
    #[must_use]
    pub fn instance_state(&self, instance_id: &str) -> Option<InstanceState> {
        self.fleet.lock().get(instance_id).cloned()
    }

    /// Dispatches a decoded request to the operation named `operation` and
    /// encodes the reply.
    ///
    /// # Errors
    ///
    /// Returns the `StubFault` the endpoint should answer with.
    pub fn handle(
        &self,
        operation: &str,
        request: &RequestEnvelope<rmpv::Value>,
    ) -> Result<Bytes, StubFault> {
        match operation {
            DescribeRegions::NAME => self.respond(request, |req| self.describe_regions(req)),
            DescribeAvailabilityZones::NAME => {
                self.respond(request, |req| self.describe_availability_zones(req))
            }
            StartInstances::NAME => self.respond(request, |req| self.start_instances(req)),
            StopInstances::NAME => self.respond(request, |req| self.stop_instances(req)),
            other => Err(StubFault::new(
                StatusCode::NOT_IMPLEMENTED,
                "InvalidAction",
                format!("The action {other} is not valid for this web service."),
            )),
        }
    }

    fn respond<Req, Resp>(
        &self,
        request: &RequestEnvelope<rmpv::Value>,
        handler: impl FnOnce(Req) -> Result<Resp, StubFault>,
    ) -> Result<Bytes, StubFault>
    where
        Req: DeserializeOwned,
        Resp: Serialize,
    {
        let codec = WireCodec;
        let body: Req = codec
            .body(request.body.clone())
            .map_err(|err| StubFault::invalid_parameter("body", None, err.to_string()))?;
        let response = handler(body)?;
        codec.reply_to(request, &response).map_err(|err| {
            StubFault::new(StatusCode::INTERNAL_SERVER_ERROR, "InternalError", err.to_string())
        })
    }

    fn request_id(&self) -> String {
        let n = self.next_request.fetch_add(1, Ordering::Relaxed);
        format!("req-{n:08x}")
    }

    // -- regions ------------------------------------------------------------

    fn describe_regions(
        &self,
        request: DescribeRegionsRequest,
    ) -> Result<DescribeRegionsResponse, StubFault> {
        if let Some(names) = &request.region_names {
            if let Some(unknown) = names.iter().find(|n| region(n).is_none()) {
                return Err(StubFault::invalid_parameter(
                    "RegionName",
                    Some(unknown.as_str()),
                    format!("Invalid region: {unknown}"),
                ));
            }
        }

        let all = request.all_regions.unwrap_or(false);
        let regions = REGIONS
            .iter()
            .filter(|(name, status)| match &request.region_names {
                Some(names) => names.iter().any(|n| n == name),
                None => all || *status != "not-opted-in",
            })
            .map(|(name, status)| RegionInfo {
                region_name: (*name).to_string(),
                region_endpoint: format!("ec2.{name}.amazonaws.com"),
                opt_in_status: Some((*status).to_string()),
            })
            .collect();

        Ok(DescribeRegionsResponse {
            request_id: self.request_id(),
            regions,
        })
    }

    fn describe_availability_zones(
        &self,
        request: DescribeAvailabilityZonesRequest,
    ) -> Result<DescribeAvailabilityZonesResponse, StubFault> {
        let region_name = request.region_name.as_deref().unwrap_or(REGIONS[0].0);
        if region(region_name).is_none() {
            return Err(StubFault::invalid_parameter(
                "RegionName",
                Some(region_name),
                format!("Invalid region: {region_name}"),
            ));
        }

        let availability_zones = (0..ZONES_PER_REGION)
            .map(|i| {
                let suffix = char::from(b'a' + i);
                AvailabilityZone {
                    zone_name: format!("{region_name}{suffix}"),
                    zone_id: format!("{}-az{}", zone_prefix(region_name), i + 1),
                    region_name: region_name.to_string(),
                    state: "available".to_string(),
                }
            })
            .filter(|zone| match &request.zone_names {
                Some(names) => names.contains(&zone.zone_name),
                None => true,
            })
            .collect();

        Ok(DescribeAvailabilityZonesResponse {
            request_id: self.request_id(),
            availability_zones,
        })
    }

    // -- instances ----------------------------------------------------------

    fn start_instances(
        &self,
        request: StartInstancesRequest,
    ) -> Result<StartInstancesResponse, StubFault> {
        let changes = self.transition(&request.instance_ids, request.dry_run, |state| {
            match state.name.as_str() {
                "stopped" => Some((InstanceState::pending(), InstanceState::running())),
                "running" | "pending" => Some((state.clone(), state.clone())),
                _ => None,
            }
        })?;
        Ok(StartInstancesResponse {
            request_id: self.request_id(),
            starting_instances: changes,
        })
    }

    fn stop_instances(
        &self,
        request: StopInstancesRequest,
    ) -> Result<StopInstancesResponse, StubFault> {
        let changes = self.transition(&request.instance_ids, request.dry_run, |state| {
            match state.name.as_str() {
                "running" => Some((InstanceState::stopping(), InstanceState::stopped())),
                "stopped" | "stopping" => Some((state.clone(), state.clone())),
                _ => None,
            }
        })?;
        Ok(StopInstancesResponse {
            request_id: self.request_id(),
            stopping_instances: changes,
        })
    }

    /// Applies a state transition to every listed instance, or to none.
    ///
    /// `step` maps the current state to `(reported, settled)`: the state
    /// reported in the reply and the state stored in the fleet. `None` means
    /// the transition is not allowed from the current state.
    fn transition(
        &self,
        instance_ids: &[String],
        dry_run: Option<bool>,
        step: impl Fn(&InstanceState) -> Option<(InstanceState, InstanceState)>,
    ) -> Result<Vec<InstanceStateChange>, StubFault> {
        if instance_ids.is_empty() {
            return Err(StubFault::invalid_parameter(
                "InstanceId",
                None,
                "At least one instance id is required.",
            ));
        }

        let mut fleet = self.fleet.lock();

        let missing: Vec<String> = instance_ids
            .iter()
            .filter(|id| !fleet.contains_key(id.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(StubFault::new(
                StatusCode::BAD_REQUEST,
                INVALID_INSTANCE_ID_NOT_FOUND,
                format!("The instance IDs '{}' do not exist", missing.join(", ")),
            )
            .with_detail(&InvalidInstanceIdNotFound {
                instance_ids: missing,
            }));
        }

        let mut planned = Vec::with_capacity(instance_ids.len());
        for id in instance_ids {
            let Some(previous) = fleet.get(id.as_str()).cloned() else {
                continue;
            };
            let Some((reported, settled)) = step(&previous) else {
                return Err(StubFault::new(
                    StatusCode::CONFLICT,
                    INCORRECT_INSTANCE_STATE,
                    format!("The instance '{id}' is not in a state from which it can be changed."),
                )
                .with_detail(&IncorrectInstanceState {
                    instance_id: id.clone(),
                    state: previous.name,
                }));
            };
            planned.push((id.clone(), previous, reported, settled));
        }

        if dry_run == Some(true) {
            return Err(StubFault::dry_run(self.request_id()));
        }

        Ok(planned
            .into_iter()
            .map(|(instance_id, previous_state, current_state, settled)| {
                fleet.insert(instance_id.clone(), settled);
                InstanceStateChange {
                    instance_id,
                    current_state,
                    previous_state,
                }
            })
            .collect())
    }
}

fn region(name: &str) -> Option<&'static (&'static str, &'static str)> {
    REGIONS.iter().find(|(n, _)| *n == name)
}

/// `us-east-1` becomes `use1`, the prefix of its zone ids.
fn zone_prefix(region: &str) -> String {
    let mut parts = region.split('-');
    let country = parts.next().unwrap_or_default();
    let direction: String = parts.next().unwrap_or_default().chars().take(1).collect();
    let number = parts.next().unwrap_or_default();
    format!("{country}{direction}{number}")
}
