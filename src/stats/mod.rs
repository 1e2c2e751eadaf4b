//! Stats caching subsystem.
//!
//! Keeps an aggregate [`StatsSnapshot`](crate::domain::stats::StatsSnapshot) of
//! the item collection and refreshes it from change events:
//!
//! - **Trigger**: publishes [`ChangeEvent`]s into a bounded queue
//! - **Watcher**: turns filesystem notifications on the backing document into events
//! - **Consumer**: the single task that drains the queue and recomputes
//! - **Cache**: holds the latest snapshot; readers get it without recomputing
//!
//! ```toml
//! [stats]
//! watch = true
//! debounce_ms = 50
//! queue_capacity = 64
//! ```

mod cache;
mod config;
mod consumer;
mod events;
mod lock;
mod trigger;
mod watcher;

pub use cache::{RecomputeOutcome, StatsCache};
pub use config::StatsConfig;
pub use consumer::StatsConsumer;
pub use events::{ChangeEvent, ChangeKind, Epoch};
pub use trigger::{StatsTrigger, channel};
pub use watcher::ChangeWatcher;
