//! Snapshot holder.
//!
//! Starts empty (uninitialized); the first successful [`StatsCache::recompute`]
//! makes it ready and it stays ready for the life of the process. A failed
//! recompute keeps whatever snapshot was there before.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use time::OffsetDateTime;
use tracing::{error, info, instrument};

use crate::application::repos::ItemsRepo;
use crate::domain::stats::{StatsSnapshot, next_stamp, summarize};

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "stats::cache";
const METRIC_RECOMPUTE_TOTAL: &str = "catalog_stats_recompute_total";
const METRIC_RECOMPUTE_MS: &str = "catalog_stats_recompute_ms";
const METRIC_ITEMS: &str = "catalog_stats_items";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeOutcome {
    /// A fresh snapshot replaced the previous one.
    Refreshed,
    /// The collection could not be read; the previous snapshot (if any) stays.
    Retained,
}

impl RecomputeOutcome {
    fn as_str(self) -> &'static str {
        match self {
            RecomputeOutcome::Refreshed => "refreshed",
            RecomputeOutcome::Retained => "retained",
        }
    }
}

pub struct StatsCache {
    source: Arc<dyn ItemsRepo>,
    snapshot: RwLock<Option<Arc<StatsSnapshot>>>,
}

impl StatsCache {
    pub fn new(source: Arc<dyn ItemsRepo>) -> Self {
        Self {
            source,
            snapshot: RwLock::new(None),
        }
    }

    /// Latest snapshot, or `None` before the first successful recompute.
    pub fn get(&self) -> Option<Arc<StatsSnapshot>> {
        rw_read(&self.snapshot, SOURCE, "get").clone()
    }

    pub fn is_ready(&self) -> bool {
        rw_read(&self.snapshot, SOURCE, "is_ready").is_some()
    }

    /// Re-read the whole collection and replace the snapshot.
    ///
    /// The replacement is a single assignment, so concurrent readers see either
    /// the old or the new snapshot. Overlapping calls are tolerated: the last
    /// one to finish wins.
    #[instrument(skip(self))]
    pub async fn recompute(&self) -> RecomputeOutcome {
        let started_at = Instant::now();

        let outcome = match self.source.load_items().await {
            Ok(items) => {
                let mut slot = rw_write(&self.snapshot, SOURCE, "recompute");
                let stamp = next_stamp(slot.as_deref(), OffsetDateTime::now_utc());
                let snapshot = summarize(&items, stamp);

                gauge!(METRIC_ITEMS).set(snapshot.total as f64);
                info!(
                    target = "catalog::stats",
                    total = snapshot.total,
                    average_price = snapshot.average_price,
                    "Stats snapshot refreshed"
                );

                *slot = Some(Arc::new(snapshot));
                RecomputeOutcome::Refreshed
            }
            Err(err) => {
                error!(
                    target = "catalog::stats",
                    error = %err,
                    has_previous = self.is_ready(),
                    "Stats recompute failed; keeping previous snapshot"
                );
                RecomputeOutcome::Retained
            }
        };

        counter!(METRIC_RECOMPUTE_TOTAL, "outcome" => outcome.as_str()).increment(1);
        histogram!(METRIC_RECOMPUTE_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        outcome
    }
}
