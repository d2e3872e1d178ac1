//! Fan-out of region collections and fan-in of their results.

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::aggregate::ActivitySummary;
use super::collector::{collect_region, CollectOptions};
use super::errors::CollectionError;
use super::source::{EventSource, TimeWindow};

pub const DEFAULT_MAX_CONCURRENT_REGIONS: usize = 16;

/// Merged result of a full collection run. Failed regions contribute no
/// counts; their failure reasons end up keyed by region name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOutcome {
    pub summary: ActivitySummary,
    pub regions_failed: BTreeMap<String, String>,
}

struct RegionOutcome {
    region: String,
    result: Result<ActivitySummary, CollectionError>,
}

/// Collects every target region concurrently and merges the results.
///
/// One task per region runs under a semaphore bound; each task reports
/// its outcome over a channel whose single consumer performs all merging,
/// so no two region summaries ever touch the run summary concurrently.
/// A failing region is recorded and the run continues; a run where every
/// region fails still returns an empty summary plus a full failure map.
pub async fn collect_all_regions(
    source: Arc<dyn EventSource>,
    regions: &[String],
    window: TimeWindow,
    options: CollectOptions,
    max_concurrent_regions: usize,
    cancel: CancellationToken,
) -> RunOutcome {
    let semaphore = Arc::new(Semaphore::new(max_concurrent_regions.max(1)));
    let (outcome_tx, mut outcome_rx) = mpsc::channel::<RegionOutcome>(regions.len().max(1));

    let mut tasks: FuturesUnordered<BoxFuture<'static, ()>> = FuturesUnordered::new();
    for region in regions {
        let region = region.clone();
        let source = Arc::clone(&source);
        let semaphore = Arc::clone(&semaphore);
        let options = options.clone();
        let cancel = cancel.clone();
        let outcome_tx = outcome_tx.clone();
        tasks.push(Box::pin(async move {
            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            let result = collect_region(source.as_ref(), &region, window, &options, &cancel).await;
            let _ = outcome_tx.send(RegionOutcome { region, result }).await;
        }));
    }
    drop(outcome_tx);

    let fan_out = async move { while tasks.next().await.is_some() {} };

    let mut pending: HashSet<String> = regions.iter().cloned().collect();
    let merge_loop = async {
        let mut summary = ActivitySummary::new();
        let mut regions_failed = BTreeMap::new();
        while let Some(outcome) = outcome_rx.recv().await {
            pending.remove(&outcome.region);
            match outcome.result {
                Ok(region_summary) => {
                    debug!(
                        "Merged region {}, {} regions pending",
                        outcome.region,
                        pending.len()
                    );
                    summary.merge(region_summary);
                }
                Err(err) => {
                    warn!(
                        "Failed reading CloudTrail events from region {}: {}",
                        err.region, err.reason
                    );
                    regions_failed.insert(err.region, err.reason);
                }
            }
        }
        (summary, regions_failed)
    };

    let ((), (summary, regions_failed)) = tokio::join!(fan_out, merge_loop);
    RunOutcome {
        summary,
        regions_failed,
    }
}
