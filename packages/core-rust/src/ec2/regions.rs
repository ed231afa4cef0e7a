use serde::{Deserialize, Serialize};

use crate::descriptor::Operation;

// ---------------------------------------------------------------------------
// DescribeRegions
// ---------------------------------------------------------------------------

/// Lists the regions available to the account.
#[derive(Debug)]
pub struct DescribeRegions;

impl Operation for DescribeRegions {
    const NAME: &'static str = "DescribeRegions";
    const ACTION: &'static str = "http://ec2.amazonaws.com/doc/2016-11-15/DescribeRegions";
    type Request = DescribeRegionsRequest;
    type Response = DescribeRegionsResponse;
}

/// An empty request lists every enabled region.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeRegionsRequest {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub region_names: Option<Vec<String>>,
    /// Include regions that are disabled for the account.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub all_regions: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeRegionsResponse {
    pub request_id: String,
    #[serde(default)]
    pub regions: Vec<RegionInfo>,
}

impl DescribeRegionsResponse {
    /// Region names in payload order.
    pub fn region_names(&self) -> impl Iterator<Item = &str> {
        self.regions.iter().map(|r| r.region_name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionInfo {
    pub region_name: String,
    pub region_endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub opt_in_status: Option<String>,
}

// ---------------------------------------------------------------------------
// DescribeAvailabilityZones
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct DescribeAvailabilityZones;

impl Operation for DescribeAvailabilityZones {
    const NAME: &'static str = "DescribeAvailabilityZones";
    const ACTION: &'static str =
        "http://ec2.amazonaws.com/doc/2016-11-15/DescribeAvailabilityZones";
    type Request = DescribeAvailabilityZonesRequest;
    type Response = DescribeAvailabilityZonesResponse;
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeAvailabilityZonesRequest {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub zone_names: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub region_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeAvailabilityZonesResponse {
    pub request_id: String,
    #[serde(default)]
    pub availability_zones: Vec<AvailabilityZone>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityZone {
    pub zone_name: String,
    pub zone_id: String,
    pub region_name: String,
    pub state: String,
}
