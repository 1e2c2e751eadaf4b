//! The single consumer of change events.
//!
//! Receives events, waits out the debounce window, folds everything queued in
//! the meantime into one batch and runs exactly one recompute per batch.
//! Recomputes triggered through the queue therefore never overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use super::cache::{RecomputeOutcome, StatsCache};
use super::events::ChangeEvent;

pub struct StatsConsumer {
    cache: Arc<StatsCache>,
    receiver: mpsc::Receiver<ChangeEvent>,
    debounce: Duration,
}

impl StatsConsumer {
    pub fn new(
        cache: Arc<StatsCache>,
        receiver: mpsc::Receiver<ChangeEvent>,
        debounce: Duration,
    ) -> Self {
        Self {
            cache,
            receiver,
            debounce,
        }
    }

    /// Run until every trigger has been dropped.
    pub async fn run(mut self) {
        while let Some(outcome) = self.consume_next().await {
            debug!(outcome = ?outcome, "Stats batch consumed");
        }
        info!("Stats consumer stopped: all triggers dropped");
    }

    /// Wait for the next batch and process it.
    ///
    /// Returns `None` once the queue is closed and empty.
    pub async fn consume_next(&mut self) -> Option<RecomputeOutcome> {
        let first = self.receiver.recv().await?;
        let batch = self.collect_batch(first).await;
        Some(self.process(batch).await)
    }

    async fn collect_batch(&mut self, first: ChangeEvent) -> Vec<ChangeEvent> {
        if !self.debounce.is_zero() {
            tokio::time::sleep(self.debounce).await;
        }

        let mut batch = vec![first];
        while let Ok(event) = self.receiver.try_recv() {
            batch.push(event);
        }
        batch
    }

    async fn process(&self, batch: Vec<ChangeEvent>) -> RecomputeOutcome {
        let event_ids: Vec<Uuid> = batch.iter().map(|event| event.id).collect();
        let kinds: Vec<&'static str> = batch.iter().map(|event| event.kind.as_str()).collect();
        let latest_epoch = batch.iter().map(|event| event.epoch).max().unwrap_or_default();

        info!(
            event_count = batch.len(),
            event_ids = ?event_ids,
            event_kinds = ?kinds,
            latest_epoch,
            "Stats recompute starting"
        );

        let outcome = self.cache.recompute().await;

        info!(
            event_count = batch.len(),
            outcome = ?outcome,
            "Stats recompute complete"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::application::repos::{ItemsRepo, RepoError};
    use crate::domain::items::Item;
    use crate::stats::{StatsConfig, channel};

    #[derive(Default)]
    struct CountingRepo {
        loads: AtomicUsize,
    }

    #[async_trait]
    impl ItemsRepo for CountingRepo {
        async fn load_items(&self) -> Result<Vec<Item>, RepoError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Item {
                id: 1,
                name: "Apple".to_string(),
                price: 10.0,
                category: "Food".to_string(),
            }])
        }

        async fn save_items(&self, _items: &[Item]) -> Result<(), RepoError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn burst_of_events_runs_one_recompute() {
        let repo = Arc::new(CountingRepo::default());
        let cache = Arc::new(StatsCache::new(repo.clone()));
        let (trigger, receiver) = channel(&StatsConfig::default());
        let mut consumer = StatsConsumer::new(cache.clone(), receiver, Duration::ZERO);

        trigger.startup();
        trigger.item_created(1);
        trigger.item_created(2);

        assert_eq!(consumer.consume_next().await, Some(RecomputeOutcome::Refreshed));
        assert_eq!(repo.loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get().unwrap().total, 1);
    }

    #[tokio::test]
    async fn debounce_folds_late_events_into_the_batch() {
        let repo = Arc::new(CountingRepo::default());
        let cache = Arc::new(StatsCache::new(repo.clone()));
        let (trigger, receiver) = channel(&StatsConfig::default());
        let trigger = Arc::new(trigger);
        let mut consumer = StatsConsumer::new(cache, receiver, Duration::from_millis(100));

        trigger.startup();
        let late = trigger.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            late.item_created(5);
        });

        consumer.consume_next().await;
        assert_eq!(repo.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_stops_when_triggers_are_dropped() {
        let repo = Arc::new(CountingRepo::default());
        let cache = Arc::new(StatsCache::new(repo.clone()));
        let (trigger, receiver) = channel(&StatsConfig::default());
        let consumer = StatsConsumer::new(cache.clone(), receiver, Duration::ZERO);

        trigger.startup();
        drop(trigger);
        consumer.run().await;

        assert!(cache.is_ready());
        assert_eq!(repo.loads.load(Ordering::SeqCst), 1);
    }
}
