use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::application::items::ItemService;
use crate::application::repos::ItemsRepo;
use crate::stats::StatsCache;

#[derive(Clone)]
pub struct ApiState {
    pub items: Arc<ItemService>,
    pub stats: Arc<StatsCache>,
    /// Used by the health probe to check the document is readable.
    pub repo: Arc<dyn ItemsRepo>,
    pub default_page_size: NonZeroUsize,
}
