//! Shared, observable item listing.
//!
//! Starting a fetch cancels whichever fetch was in flight before it. A
//! cancelled fetch never touches the state, and its failure is swallowed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use catalog_api_types::Item;
use tokio::sync::watch;
use tracing::{debug, error};

use crate::cancel::CancellationToken;
use crate::client::{ClientError, ItemsPage, ItemsRequest};

/// Anything that can produce a page of items.
#[async_trait]
pub trait ItemsSource: Send + Sync {
    async fn fetch_page(&self, request: &ItemsRequest) -> Result<ItemsPage, ClientError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    pub items: Vec<Item>,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response was committed to the shared state.
    Applied,
    /// A newer fetch superseded this one; the state was left alone.
    Cancelled,
}

pub struct ItemsFeed {
    source: Arc<dyn ItemsSource>,
    current: Mutex<Option<CancellationToken>>,
    state: watch::Sender<FeedState>,
    cancellations: AtomicU64,
}

impl ItemsFeed {
    pub fn new(source: Arc<dyn ItemsSource>) -> Self {
        let (state, _) = watch::channel(FeedState::default());
        Self {
            source,
            current: Mutex::new(None),
            state,
            cancellations: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    pub fn items(&self) -> Vec<Item> {
        self.state.borrow().items.clone()
    }

    pub fn total(&self) -> u64 {
        self.state.borrow().total
    }

    /// Number of in-flight fetches cancelled by a newer one.
    pub fn cancellations(&self) -> u64 {
        self.cancellations.load(Ordering::SeqCst)
    }

    pub async fn fetch_items(&self, request: ItemsRequest) -> Result<FetchOutcome, ClientError> {
        let token = self.begin();

        let result = tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!(page = request.page, q = %request.q, "Items fetch cancelled");
                return Ok(FetchOutcome::Cancelled);
            }
            result = self.source.fetch_page(&request) => result,
        };

        match result {
            Ok(page) => Ok(self.commit(&token, page)),
            Err(_) if token.is_cancelled() => Ok(FetchOutcome::Cancelled),
            Err(err) => {
                error!(
                    error = %err,
                    page = request.page,
                    q = %request.q,
                    "Items fetch failed"
                );
                Err(err)
            }
        }
    }

    /// Install a fresh token, cancelling the previous in-flight one.
    fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let previous = self.lock_current().replace(token.clone());
        if let Some(previous) = previous
            && previous.cancel()
        {
            self.cancellations.fetch_add(1, Ordering::SeqCst);
        }
        token
    }

    fn commit(&self, token: &CancellationToken, page: ItemsPage) -> FetchOutcome {
        // Holding the slot lock keeps a newer fetch from starting between check and write.
        let mut current = self.lock_current();
        if token.is_cancelled() {
            return FetchOutcome::Cancelled;
        }

        self.state.send_replace(FeedState {
            items: page.items,
            total: page.total,
        });
        *current = None;
        FetchOutcome::Applied
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use reqwest::StatusCode;
    use tokio::sync::{Mutex as AsyncMutex, Notify, oneshot};

    use super::*;

    fn item(id: u64, name: &str) -> Item {
        Item {
            id,
            name: name.to_string(),
            price: 1.0,
            category: "Test".to_string(),
        }
    }

    /// Answers per query; queries with a gate wait until the gate is released.
    #[derive(Default)]
    struct GatedSource {
        pages: HashMap<String, Result<Vec<Item>, StatusCode>>,
        gates: AsyncMutex<HashMap<String, oneshot::Receiver<()>>>,
        started: Notify,
    }

    impl GatedSource {
        fn answer(mut self, q: &str, items: Vec<Item>) -> Self {
            self.pages.insert(q.to_string(), Ok(items));
            self
        }

        fn fail(mut self, q: &str, status: StatusCode) -> Self {
            self.pages.insert(q.to_string(), Err(status));
            self
        }

        async fn gate(&self, q: &str) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().await.insert(q.to_string(), rx);
            tx
        }
    }

    #[async_trait]
    impl ItemsSource for GatedSource {
        async fn fetch_page(&self, request: &ItemsRequest) -> Result<ItemsPage, ClientError> {
            let gate = self.gates.lock().await.remove(&request.q);
            self.started.notify_one();
            if let Some(gate) = gate {
                let _ = gate.await;
            }

            match self.pages.get(&request.q) {
                Some(Ok(items)) => Ok(ItemsPage {
                    items: items.clone(),
                    total: items.len() as u64,
                }),
                Some(Err(status)) => Err(ClientError::Server {
                    status: *status,
                    message: "boom".to_string(),
                }),
                None => Ok(ItemsPage {
                    items: Vec::new(),
                    total: 0,
                }),
            }
        }
    }

    fn query(q: &str) -> ItemsRequest {
        ItemsRequest {
            q: q.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn applied_fetch_updates_state() {
        let source = GatedSource::default().answer("", vec![item(1, "Apple"), item(2, "Banana")]);
        let feed = ItemsFeed::new(Arc::new(source));
        let mut updates = feed.subscribe();

        let outcome = feed.fetch_items(query("")).await.unwrap();

        assert_eq!(outcome, FetchOutcome::Applied);
        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().items.len(), 2);
        assert_eq!(feed.total(), 2);
        assert_eq!(feed.cancellations(), 0);
    }

    #[tokio::test]
    async fn newer_fetch_cancels_older_one() {
        let source = Arc::new(
            GatedSource::default()
                .answer("a", vec![item(1, "Alpha")])
                .answer("b", vec![item(2, "Beta"), item(3, "Bravo")]),
        );
        let release_a = source.gate("a").await;
        let feed = Arc::new(ItemsFeed::new(source.clone()));

        let first = {
            let feed = feed.clone();
            tokio::spawn(async move { feed.fetch_items(query("a")).await })
        };
        source.started.notified().await;

        let second = feed.fetch_items(query("b")).await.unwrap();
        let _ = release_a.send(());
        let first = first.await.unwrap().unwrap();

        assert_eq!(first, FetchOutcome::Cancelled);
        assert_eq!(second, FetchOutcome::Applied);
        assert_eq!(feed.cancellations(), 1);
        let names: Vec<_> = feed.items().into_iter().map(|item| item.name).collect();
        assert_eq!(names, vec!["Beta", "Bravo"]);
    }

    #[tokio::test]
    async fn completed_fetch_is_not_counted_as_cancelled() {
        let source = GatedSource::default()
            .answer("a", vec![item(1, "Alpha")])
            .answer("b", vec![item(2, "Beta")]);
        let feed = ItemsFeed::new(Arc::new(source));

        feed.fetch_items(query("a")).await.unwrap();
        feed.fetch_items(query("b")).await.unwrap();

        assert_eq!(feed.cancellations(), 0);
        assert_eq!(feed.items()[0].name, "Beta");
    }

    #[tokio::test]
    async fn failure_leaves_state_unchanged() {
        let source = GatedSource::default()
            .answer("ok", vec![item(1, "Apple")])
            .fail("bad", StatusCode::INTERNAL_SERVER_ERROR);
        let feed = ItemsFeed::new(Arc::new(source));

        feed.fetch_items(query("ok")).await.unwrap();
        let err = feed.fetch_items(query("bad")).await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(feed.items().len(), 1);
        assert_eq!(feed.total(), 1);
    }

    #[tokio::test]
    async fn cancelled_failure_is_swallowed() {
        let source = Arc::new(
            GatedSource::default()
                .fail("slow", StatusCode::BAD_GATEWAY)
                .answer("fast", vec![item(5, "Echo")]),
        );
        let release = source.gate("slow").await;
        let feed = Arc::new(ItemsFeed::new(source.clone()));

        let slow = {
            let feed = feed.clone();
            tokio::spawn(async move { feed.fetch_items(query("slow")).await })
        };
        source.started.notified().await;
        feed.fetch_items(query("fast")).await.unwrap();
        let _ = release.send(());

        let outcome = tokio::time::timeout(Duration::from_secs(1), slow)
            .await
            .expect("slow fetch finished")
            .unwrap();
        assert_eq!(outcome.unwrap(), FetchOutcome::Cancelled);
        assert_eq!(feed.items()[0].name, "Echo");
    }
}
