//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::items::Item;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("malformed item document: {message}")]
    Malformed { message: String },
    #[error("storage timeout after {millis} ms")]
    Timeout { millis: u128 },
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// Whole-collection access to the item document.
///
/// There is no partial write: `save_items` replaces the entire collection and
/// concurrent writers race with last-writer-wins semantics.
#[async_trait]
pub trait ItemsRepo: Send + Sync {
    async fn load_items(&self) -> Result<Vec<Item>, RepoError>;

    async fn save_items(&self, items: &[Item]) -> Result<(), RepoError>;
}
