use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cloud::CloudApi;
use crate::region::{bounded, scan_region, RegionOutcome};
use crate::types::{ScanResult, SkippedRegion};

pub const DEFAULT_BASE_REGION: &str = "us-east-1";
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const MAX_CONCURRENCY: usize = 64;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Knobs for one scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Region whose endpoint answers the region-discovery call.
    pub base_region: String,
    /// Regions scanned at once; clamped to `1..=MAX_CONCURRENCY`.
    pub concurrency: usize,
    /// Upper bound on each individual provider call.
    pub call_timeout: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            base_region: DEFAULT_BASE_REGION.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Discover every region and scan them with a bounded number of concurrent tasks.
///
/// - Region discovery failing is the only way to get `success == false`.
/// - A region that errors or times out is skipped and listed in `skipped_regions`.
/// - Records come back in region-list order regardless of completion order.
pub async fn scan_all(api: Arc<dyn CloudApi>, options: &ScanOptions) -> ScanResult {
    scan_all_internal(api, options, None).await
}

/// Variant that accepts a `CancellationToken`; regions not yet started when it
/// fires are skipped with reason "cancelled".
pub async fn scan_all_with_cancel(
    api: Arc<dyn CloudApi>,
    options: &ScanOptions,
    cancel: CancellationToken,
) -> ScanResult {
    scan_all_internal(api, options, Some(cancel)).await
}

async fn scan_all_internal(
    api: Arc<dyn CloudApi>,
    options: &ScanOptions,
    cancel_opt: Option<CancellationToken>,
) -> ScanResult {
    let regions = match bounded(options.call_timeout, api.list_regions(&options.base_region)).await
    {
        Ok(regions) => regions,
        Err(e) => {
            error!(base_region = %options.base_region, error = %e, "region discovery failed");
            return ScanResult::failed(format!("Failed to retrieve AWS regions: {e}"));
        }
    };
    info!(regions = regions.len(), "scanning AWS regions");

    let sem = Arc::new(Semaphore::new(options.concurrency.clamp(1, MAX_CONCURRENCY)));
    let cancel = cancel_opt.unwrap_or_default();
    let mut set = JoinSet::new();

    for (idx, region) in regions.iter().cloned().enumerate() {
        let sem = sem.clone();
        let api = api.clone();
        let cancel = cancel.clone();
        let call_timeout = options.call_timeout;

        set.spawn(async move {
            // keep the permit until the region is done
            let _permit = tokio::select! {
                permit = sem.acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => return (idx, cancelled()),
                },
                _ = cancel.cancelled() => return (idx, cancelled()),
            };
            if cancel.is_cancelled() {
                return (idx, cancelled());
            }

            info!(region = %region, "scanning region");
            (idx, scan_region(api.as_ref(), &region, call_timeout).await)
        });
    }

    // Barrier: completion order is arbitrary, so outcomes are slotted by region index.
    let mut outcomes: Vec<Option<RegionOutcome>> = vec![None; regions.len()];
    while let Some(res) = set.join_next().await {
        match res {
            Ok((idx, outcome)) => outcomes[idx] = Some(outcome),
            Err(e) => warn!(error = %e, "region task did not complete"),
        }
    }

    let mut result = ScanResult {
        success: true,
        regions_scanned: regions.len(),
        ..Default::default()
    };
    for (region, outcome) in regions.into_iter().zip(outcomes) {
        match outcome {
            Some(RegionOutcome::Scanned(records)) => result.records.extend(records),
            Some(RegionOutcome::Skipped { reason }) => {
                result.skipped_regions.push(SkippedRegion { region, reason })
            }
            None => result.skipped_regions.push(SkippedRegion {
                region,
                reason: "region task aborted".to_string(),
            }),
        }
    }

    info!(
        entries = result.total_entries(),
        regions = result.regions_scanned,
        skipped = result.skipped_regions.len(),
        "scan complete"
    );
    result
}

fn cancelled() -> RegionOutcome {
    RegionOutcome::Skipped {
        reason: "cancelled".to_string(),
    }
}
