//! Change events that drive stats recomputation.

use std::path::PathBuf;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::items::ItemId;

/// Monotonic sequence number assigned by the trigger.
pub type Epoch = u64;

/// A signal that the item collection may have changed.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Unique identifier for log correlation.
    pub id: Uuid,
    /// Publication order within this process.
    pub epoch: Epoch,
    pub kind: ChangeKind,
    pub timestamp: OffsetDateTime,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    /// Unconditional first load when the process starts.
    Startup,
    /// The watcher saw a completed write on the backing document.
    DocumentChanged { path: PathBuf },
    /// This process appended an item.
    ItemCreated { item_id: ItemId },
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Startup => "startup",
            ChangeKind::DocumentChanged { .. } => "document_changed",
            ChangeKind::ItemCreated { .. } => "item_created",
        }
    }
}
