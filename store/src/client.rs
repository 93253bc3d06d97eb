use crate::config::{PROTOCOL_VERSION, StoreConfig};
use crate::filter::Filter;
use crate::properties::{Page, Properties};
use async_trait::async_trait;
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("invalid store URL: {0}")]
    InvalidUrl(String),
    #[error("store request failed with status {status}: {message}")]
    Api { status: StatusCode, message: String },
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// The store operations this system depends on: query-by-filter, create-page
/// and patch-page. Handlers hold this as `Arc<dyn DocumentStore>` so tests
/// can substitute an in-memory implementation.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn query(&self, filter: Filter) -> Result<Vec<Page>>;
    async fn create_page(&self, properties: Properties) -> Result<Page>;
    async fn update_page(&self, page_id: &str, properties: Properties) -> Result<Page>;
}

/// HTTP client for the production document store.
pub struct NotionStore {
    client: reqwest::Client,
    config: StoreConfig,
}

#[derive(Deserialize)]
struct QueryResponse {
    results: Vec<Page>,
    has_more: bool,
    next_cursor: Option<String>,
}

impl NotionStore {
    pub fn new(config: StoreConfig) -> Self {
        NotionStore {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> Result<url::Url> {
        url::Url::parse(&self.config.base_url)
            .and_then(|base| base.join(path))
            .map_err(|e| StoreError::InvalidUrl(e.to_string()))
    }

    fn request(&self, method: reqwest::Method, url: url::Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.config.token)
            .header("Notion-Version", PROTOCOL_VERSION)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(StoreError::Api { status, message })
    }
}

#[async_trait]
impl DocumentStore for NotionStore {
    async fn query(&self, filter: Filter) -> Result<Vec<Page>> {
        let url = self.endpoint(&format!("/v1/databases/{}/query", self.config.database_id))?;
        let filter = filter.to_json();

        let mut pages = Vec::new();
        let mut next_cursor: Option<String> = None;

        // Results arrive in cursor-delimited batches; follow the cursor until
        // the store reports no more.
        loop {
            let mut body = json!({ "filter": filter.clone() });
            if let Some(ref cursor) = next_cursor {
                body["start_cursor"] = json!(cursor);
            }

            let response = self
                .request(reqwest::Method::POST, url.clone())
                .json(&body)
                .send()
                .await?;
            let batch: QueryResponse = Self::check(response).await?.json().await?;

            pages.extend(batch.results);
            next_cursor = batch.next_cursor;

            if !batch.has_more || next_cursor.is_none() {
                break;
            }
        }

        tracing::debug!(count = pages.len(), "store query returned");
        Ok(pages)
    }

    async fn create_page(&self, properties: Properties) -> Result<Page> {
        let url = self.endpoint("/v1/pages")?;
        let body = json!({
            "parent": { "database_id": self.config.database_id },
            "properties": properties.into_value(),
        });

        let response = self
            .request(reqwest::Method::POST, url)
            .json(&body)
            .send()
            .await?;
        let page: Page = Self::check(response).await?.json().await?;
        tracing::debug!(page_id = %page.id, "created page");
        Ok(page)
    }

    async fn update_page(&self, page_id: &str, properties: Properties) -> Result<Page> {
        let url = self.endpoint(&format!("/v1/pages/{page_id}"))?;
        let body = json!({ "properties": properties.into_value() });

        let response = self
            .request(reqwest::Method::PATCH, url)
            .json(&body)
            .send()
            .await?;
        let page: Page = Self::check(response).await?.json().await?;
        tracing::debug!(page_id = %page.id, "patched page");
        Ok(page)
    }
}
