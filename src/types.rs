use serde::{Deserialize, Serialize};

/// One flattened VPC/subnet row.
///
/// A VPC without subnets is still represented by one record whose subnet
/// fields are all empty strings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkRecord {
    pub region: String,
    pub vpc_id: String,
    pub vpc_name: String,
    pub vpc_cidr: String,
    pub subnet_id: String,
    pub subnet_name: String,
    pub subnet_cidr: String,
}

impl NetworkRecord {
    pub fn has_subnet(&self) -> bool {
        !self.subnet_id.is_empty()
    }
}

/// A region whose scan was abandoned, and why.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SkippedRegion {
    pub region: String,
    pub reason: String,
}

/// Aggregate of one full scan across every discovered region.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ScanResult {
    pub success: bool,
    pub records: Vec<NetworkRecord>,
    pub regions_scanned: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_regions: Vec<SkippedRegion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanResult {
    /// Result of a scan that aborted during region discovery.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn total_entries(&self) -> usize {
        self.records.len()
    }
}
