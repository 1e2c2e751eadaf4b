use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::application::pagination::PageRequest;
use crate::application::repos::{ItemsRepo, RepoError};
use crate::domain::error::DomainError;
use crate::domain::items::{Item, ItemId, name_matches, next_item_id, validate_candidate};
use crate::stats::StatsTrigger;

#[derive(Debug, Error)]
pub enum ItemServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("item {0} not found")]
    NotFound(ItemId),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Filter and window for a listing.
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    pub search: Option<String>,
    pub page: PageRequest,
}

/// One page of a listing plus the size of the filtered set it was cut from.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub total: usize,
}

#[derive(Clone)]
pub struct ItemService {
    repo: Arc<dyn ItemsRepo>,
    stats_trigger: Option<Arc<StatsTrigger>>,
}

impl ItemService {
    pub fn new(repo: Arc<dyn ItemsRepo>) -> Self {
        Self {
            repo,
            stats_trigger: None,
        }
    }

    pub fn with_stats_trigger(mut self, trigger: Arc<StatsTrigger>) -> Self {
        self.stats_trigger = Some(trigger);
        self
    }

    #[instrument(skip(self), fields(search = query.search.as_deref().unwrap_or("")))]
    pub async fn list(&self, query: &ItemQuery) -> Result<ItemPage, ItemServiceError> {
        let items = self.repo.load_items().await?;

        let needle = query.search.as_deref().unwrap_or_default().to_lowercase();
        let matched: Vec<Item> = items
            .into_iter()
            .filter(|item| name_matches(item, &needle))
            .collect();

        let total = matched.len();
        Ok(ItemPage {
            items: query.page.apply(matched),
            total,
        })
    }

    pub async fn get(&self, id: ItemId) -> Result<Item, ItemServiceError> {
        self.repo
            .load_items()
            .await?
            .into_iter()
            .find(|item| item.id == id)
            .ok_or(ItemServiceError::NotFound(id))
    }

    /// Validate, assign an id, append and persist the whole collection.
    pub async fn create(&self, payload: &Value) -> Result<Item, ItemServiceError> {
        let candidate = validate_candidate(payload)?;

        let mut items = self.repo.load_items().await?;
        let id = next_item_id(&items, unix_millis(OffsetDateTime::now_utc()))?;
        let item = candidate.into_item(id);

        items.push(item.clone());
        self.repo.save_items(&items).await?;

        info!(
            target = "catalog::items",
            item_id = item.id,
            collection_len = items.len(),
            "Item created"
        );

        if let Some(trigger) = &self.stats_trigger {
            trigger.item_created(item.id);
        }

        Ok(item)
    }
}

fn unix_millis(at: OffsetDateTime) -> u64 {
    u64::try_from(at.unix_timestamp_nanos() / 1_000_000).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Mutex;

    use super::*;
    use crate::stats::{ChangeKind, StatsConfig};

    #[derive(Default)]
    struct MemoryRepo {
        items: Mutex<Vec<Item>>,
        saves: Mutex<usize>,
    }

    impl MemoryRepo {
        fn seeded(items: Vec<Item>) -> Self {
            Self {
                items: Mutex::new(items),
                saves: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ItemsRepo for MemoryRepo {
        async fn load_items(&self) -> Result<Vec<Item>, RepoError> {
            Ok(self.items.lock().await.clone())
        }

        async fn save_items(&self, items: &[Item]) -> Result<(), RepoError> {
            *self.items.lock().await = items.to_vec();
            *self.saves.lock().await += 1;
            Ok(())
        }
    }

    struct BrokenRepo;

    #[async_trait]
    impl ItemsRepo for BrokenRepo {
        async fn load_items(&self) -> Result<Vec<Item>, RepoError> {
            Err(RepoError::malformed("expected value at line 1 column 1"))
        }

        async fn save_items(&self, _items: &[Item]) -> Result<(), RepoError> {
            Err(RepoError::from_persistence("read-only"))
        }
    }

    fn seed() -> Vec<Item> {
        vec![
            Item {
                id: 1,
                name: "Apple".to_string(),
                price: 10.0,
                category: "Food".to_string(),
            },
            Item {
                id: 2,
                name: "Banana".to_string(),
                price: 5.0,
                category: "Food".to_string(),
            },
            Item {
                id: 3,
                name: "Pineapple".to_string(),
                price: 8.0,
                category: "Food".to_string(),
            },
        ]
    }

    fn service(repo: Arc<MemoryRepo>) -> ItemService {
        ItemService::new(repo)
    }

    #[tokio::test]
    async fn list_filters_case_insensitively() {
        let service = service(Arc::new(MemoryRepo::seeded(seed())));
        let page = service
            .list(&ItemQuery {
                search: Some("APPLE".to_string()),
                ..Default::default()
            })
            .await
            .expect("list succeeds");

        let names: Vec<&str> = page.items.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, vec!["Apple", "Pineapple"]);
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn list_limit_applies_after_filter() {
        let service = service(Arc::new(MemoryRepo::seeded(seed())));
        let page = service
            .list(&ItemQuery {
                search: Some("apple".to_string()),
                page: PageRequest::new(NonZeroUsize::MIN, NonZeroUsize::MIN),
            })
            .await
            .expect("list succeeds");

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "Apple");
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn search_text_is_matched_verbatim() {
        let items = vec![
            Item {
                id: 1,
                name: "Pie Crust".to_string(),
                price: 3.0,
                category: "Bakery".to_string(),
            },
            Item {
                id: 2,
                name: "Apple Pie".to_string(),
                price: 7.0,
                category: "Bakery".to_string(),
            },
        ];
        let service = service(Arc::new(MemoryRepo::seeded(items)));
        let page = service
            .list(&ItemQuery {
                search: Some(" pie".to_string()),
                ..Default::default()
            })
            .await
            .expect("list succeeds");

        let names: Vec<&str> = page.items.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, vec!["Apple Pie"]);
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn list_on_empty_collection_is_empty() {
        let service = service(Arc::new(MemoryRepo::default()));
        let page = service.list(&ItemQuery::default()).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn get_returns_exact_item_or_not_found() {
        let service = service(Arc::new(MemoryRepo::seeded(seed())));

        let banana = service.get(2).await.expect("banana exists");
        assert_eq!(banana, seed()[1]);

        assert!(matches!(
            service.get(999).await,
            Err(ItemServiceError::NotFound(999))
        ));
    }

    #[tokio::test]
    async fn create_persists_with_unique_ids() {
        let repo = Arc::new(MemoryRepo::seeded(seed()));
        let service = service(repo.clone());

        let mut ids = Vec::new();
        for name in ["Orange", "Kiwi", "Mango"] {
            let created = service
                .create(&json!({"name": name, "price": 3, "category": "Food"}))
                .await
                .expect("create succeeds");
            assert_eq!(created.name, name);
            ids.push(created.id);
        }

        let stored = repo.items.lock().await.clone();
        assert_eq!(stored.len(), 6);
        let mut all_ids: Vec<ItemId> = stored.iter().map(|item| item.id).collect();
        all_ids.sort_unstable();
        all_ids.dedup();
        assert_eq!(all_ids.len(), 6);
        assert_eq!(*repo.saves.lock().await, 3);
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn invalid_create_does_not_touch_the_store() {
        let repo = Arc::new(MemoryRepo::seeded(seed()));
        let service = service(repo.clone());

        let err = service.create(&json!({})).await.expect_err("invalid payload");
        assert!(matches!(err, ItemServiceError::Domain(_)));
        assert_eq!(*repo.saves.lock().await, 0);
    }

    #[tokio::test]
    async fn create_publishes_stats_event() {
        let (trigger, mut receiver) = crate::stats::channel(&StatsConfig::default());
        let service = ItemService::new(Arc::new(MemoryRepo::default()))
            .with_stats_trigger(Arc::new(trigger));

        let created = service
            .create(&json!({"name": "Orange", "price": 8, "category": "Food"}))
            .await
            .unwrap();

        let event = receiver.try_recv().expect("event published");
        assert_eq!(event.kind, ChangeKind::ItemCreated { item_id: created.id });
    }

    #[tokio::test]
    async fn repo_failures_propagate() {
        let service = ItemService::new(Arc::new(BrokenRepo));
        assert!(matches!(
            service.list(&ItemQuery::default()).await,
            Err(ItemServiceError::Repo(RepoError::Malformed { .. }))
        ));
        assert!(matches!(
            service
                .create(&json!({"name": "Orange", "price": 8, "category": "Food"}))
                .await,
            Err(ItemServiceError::Repo(_))
        ));
    }
}
