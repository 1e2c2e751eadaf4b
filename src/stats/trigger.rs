//! Stats trigger service.
//!
//! Publishes change events into the bounded queue read by the
//! [`StatsConsumer`](super::StatsConsumer). Publishing never blocks, so it is
//! safe to call from the watcher's notification thread.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::domain::items::ItemId;

use super::config::StatsConfig;
use super::events::{ChangeEvent, ChangeKind, Epoch};

const METRIC_EVENTS_DROPPED: &str = "catalog_stats_events_dropped_total";

/// Create a trigger and the receiving end of its queue.
pub fn channel(config: &StatsConfig) -> (StatsTrigger, mpsc::Receiver<ChangeEvent>) {
    let (sender, receiver) = mpsc::channel(config.queue_capacity_non_zero().get());
    (StatsTrigger::new(sender), receiver)
}

pub struct StatsTrigger {
    sender: mpsc::Sender<ChangeEvent>,
    epoch_counter: AtomicU64,
}

impl StatsTrigger {
    pub fn new(sender: mpsc::Sender<ChangeEvent>) -> Self {
        Self {
            sender,
            epoch_counter: AtomicU64::new(0),
        }
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Enqueue an event.
    ///
    /// Returns false when the event was dropped. A full queue already holds a
    /// pending recompute, so dropping loses nothing.
    pub fn publish(&self, kind: ChangeKind) -> bool {
        let event = ChangeEvent::new(kind, self.next_epoch());
        let (event_id, epoch, label) = (event.id, event.epoch, event.kind.as_str());

        match self.sender.try_send(event) {
            Ok(()) => {
                info!(
                    event_id = %event_id,
                    event_epoch = epoch,
                    event_kind = label,
                    "Stats change event enqueued"
                );
                true
            }
            Err(TrySendError::Full(_)) => {
                counter!(METRIC_EVENTS_DROPPED).increment(1);
                debug!(
                    event_id = %event_id,
                    event_kind = label,
                    "Stats change event dropped: recompute already pending"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(
                    event_id = %event_id,
                    event_kind = label,
                    "Stats change event dropped: consumer stopped"
                );
                false
            }
        }
    }

    /// Request the initial load on process start.
    pub fn startup(&self) -> bool {
        self.publish(ChangeKind::Startup)
    }

    pub fn document_changed(&self, path: &Path) -> bool {
        self.publish(ChangeKind::DocumentChanged {
            path: path.to_path_buf(),
        })
    }

    pub fn item_created(&self, item_id: ItemId) -> bool {
        self.publish(ChangeKind::ItemCreated { item_id })
    }
}
