//! Client side of the catalog API.
//!
//! [`CatalogClient`] speaks HTTP, [`ItemsFeed`] keeps the latest item listing
//! as observable state with at most one honored in-flight request, and
//! [`ItemsPager`] tracks the page/query view over it.

pub mod cancel;
pub mod client;
pub mod feed;
pub mod pager;

pub use cancel::CancellationToken;
pub use client::{CatalogClient, ClientError, ItemsPage, ItemsRequest};
pub use feed::{FeedState, FetchOutcome, ItemsFeed, ItemsSource};
pub use pager::ItemsPager;
