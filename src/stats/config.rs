//! Stats refresh configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_DEBOUNCE_MS: u64 = 50;
const DEFAULT_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsConfig {
    /// Watch the backing document for external modification.
    pub watch: bool,
    /// Window during which further change events are folded into one recompute.
    pub debounce_ms: u64,
    /// Maximum number of pending change events.
    pub queue_capacity: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            watch: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl From<&crate::config::StatsSettings> for StatsConfig {
    fn from(settings: &crate::config::StatsSettings) -> Self {
        Self {
            watch: settings.watch,
            debounce_ms: settings.debounce.as_millis() as u64,
            queue_capacity: settings.queue_capacity.get(),
        }
    }
}

impl StatsConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Queue capacity, clamped to at least one slot.
    pub fn queue_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.queue_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
