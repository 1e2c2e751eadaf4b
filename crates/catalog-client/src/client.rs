use std::time::Duration;

use async_trait::async_trait;
use catalog_api_types::{
    CreateItemRequest, ErrorBody, Item, ItemId, StatsSnapshot, TOTAL_COUNT_HEADER,
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::feed::ItemsSource;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Server { status: StatusCode, message: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            ClientError::Http(err) => err.status(),
            _ => None,
        }
    }
}

/// Parameters of one listing fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemsRequest {
    pub page: u32,
    pub limit: u32,
    pub q: String,
}

impl Default for ItemsRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            q: String::new(),
        }
    }
}

impl ItemsRequest {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
            ("q", self.q.clone()),
        ]
    }
}

/// One page of items plus the size of the filtered set.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemsPage {
    pub items: Vec<Item>,
    pub total: u64,
}

#[derive(Clone, Debug)]
pub struct CatalogClient {
    client: Client,
    base: Url,
}

impl CatalogClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base = normalize_base(Url::parse(base_url)?);
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()?;
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("catalog-cli/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base.join(path).map_err(ClientError::Url)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        Ok(self.client.request(method, self.url(path)?))
    }

    pub async fn list_items(&self, request: &ItemsRequest) -> Result<ItemsPage, ClientError> {
        let mut url = self.url("api/items")?;
        url.query_pairs_mut().extend_pairs(request.query_pairs());
        let response = self.client.get(url).send().await?;

        let header_total = response
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let items: Vec<Item> = Self::handle(response).await?;
        let total = header_total.unwrap_or(items.len() as u64);

        Ok(ItemsPage { items, total })
    }

    pub async fn get_item(&self, id: ItemId) -> Result<Item, ClientError> {
        let response = self
            .request(Method::GET, &format!("api/items/{id}"))?
            .send()
            .await?;
        Self::handle(response).await
    }

    pub async fn create_item(&self, item: &CreateItemRequest) -> Result<Item, ClientError> {
        let response = self
            .request(Method::POST, "api/items")?
            .json(item)
            .send()
            .await?;
        Self::handle(response).await
    }

    pub async fn get_stats(&self) -> Result<StatsSnapshot, ClientError> {
        let response = self.request(Method::GET, "api/stats")?.send().await?;
        Self::handle(response).await
    }

    async fn handle<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .map(|body| body.error)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            return Err(ClientError::Server { status, message });
        }
        serde_json::from_slice(&bytes).map_err(|err| ClientError::Decode(err.to_string()))
    }
}

/// Keep any path prefix, but make it a directory so relative joins append to it.
fn normalize_base(mut base: Url) -> Url {
    base.set_query(None);
    base.set_fragment(None);
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

#[async_trait]
impl ItemsSource for CatalogClient {
    async fn fetch_page(&self, request: &ItemsRequest) -> Result<ItemsPage, ClientError> {
        self.list_items(request).await
    }
}
