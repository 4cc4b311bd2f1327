use std::future::Future;
use std::time::Duration;

use tokio::time;
use tracing::{debug, warn};

use crate::cloud::{CloudApi, Tag};
use crate::error::CloudError;
use crate::types::NetworkRecord;

/// Tag key holding a resource's display name.
pub const NAME_TAG: &str = "Name";

/// What a single region contributed to a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionOutcome {
    Scanned(Vec<NetworkRecord>),
    Skipped { reason: String },
}

impl RegionOutcome {
    pub fn records(&self) -> &[NetworkRecord] {
        match self {
            RegionOutcome::Scanned(records) => records,
            RegionOutcome::Skipped { .. } => &[],
        }
    }
}

/// Value of the first tag whose key equals `wanted`, in provider order.
pub fn lookup_tag<'a>(tags: &'a [Tag], wanted: &str) -> Option<&'a str> {
    tags.iter()
        .find(|t| t.key == wanted)
        .map(|t| t.value.as_str())
}

/// Scan one region into flattened records.
///
/// Never fails: a provider error or timeout on any call abandons the whole
/// region and is reported as [`RegionOutcome::Skipped`].
pub async fn scan_region(
    api: &dyn CloudApi,
    region: &str,
    call_timeout: Duration,
) -> RegionOutcome {
    match collect_region(api, region, call_timeout).await {
        Ok(records) => {
            debug!(region, records = records.len(), "region scanned");
            RegionOutcome::Scanned(records)
        }
        Err(CloudError::Unauthorized(detail)) => {
            warn!(region, %detail, "skipping region: unauthorized");
            RegionOutcome::Skipped {
                reason: format!("unauthorized: {detail}"),
            }
        }
        Err(e) => {
            warn!(region, error = %e, "skipping region");
            RegionOutcome::Skipped {
                reason: e.to_string(),
            }
        }
    }
}

async fn collect_region(
    api: &dyn CloudApi,
    region: &str,
    call_timeout: Duration,
) -> Result<Vec<NetworkRecord>, CloudError> {
    let vpcs = bounded(call_timeout, api.list_vpcs(region)).await?;
    let mut records = Vec::new();

    for vpc in vpcs {
        let vpc_name = lookup_tag(&vpc.tags, NAME_TAG).unwrap_or_default();
        let subnets = bounded(call_timeout, api.list_subnets(region, &vpc.vpc_id)).await?;

        let base = NetworkRecord {
            region: region.to_string(),
            vpc_id: vpc.vpc_id.clone(),
            vpc_name: vpc_name.to_string(),
            vpc_cidr: vpc.cidr_block.clone(),
            ..Default::default()
        };

        if subnets.is_empty() {
            records.push(base);
            continue;
        }

        for subnet in subnets {
            records.push(NetworkRecord {
                subnet_name: lookup_tag(&subnet.tags, NAME_TAG)
                    .unwrap_or_default()
                    .to_string(),
                subnet_id: subnet.subnet_id,
                subnet_cidr: subnet.cidr_block,
                ..base.clone()
            });
        }
    }

    Ok(records)
}

/// Run a provider call under `limit`, mapping expiry to [`CloudError::Timeout`].
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, CloudError>
where
    F: Future<Output = Result<T, CloudError>>,
{
    time::timeout(limit, call)
        .await
        .unwrap_or(Err(CloudError::Timeout(limit.as_millis() as u64)))
}
