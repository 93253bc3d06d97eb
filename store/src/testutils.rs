//! Test doubles for the document store, shared by the handler crates' tests.

use crate::client::{DocumentStore, Result, StoreError};
use crate::filter::Filter;
use crate::properties::{Page, Properties};
use async_trait::async_trait;
use http::StatusCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// In-memory store with the same filter semantics as the real one.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pages: Arc<Mutex<Vec<Page>>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a page directly, bypassing the trait.
    pub async fn seed(&self, properties: Properties) -> Page {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let page = Page {
            id: format!("page-{id}"),
            properties: properties.into_map(),
        };
        self.pages.lock().await.push(page.clone());
        page
    }

    pub async fn pages(&self) -> Vec<Page> {
        self.pages.lock().await.clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query(&self, filter: Filter) -> Result<Vec<Page>> {
        Ok(self
            .pages
            .lock()
            .await
            .iter()
            .filter(|page| filter.matches(page))
            .cloned()
            .collect())
    }

    async fn create_page(&self, properties: Properties) -> Result<Page> {
        Ok(self.seed(properties).await)
    }

    async fn update_page(&self, page_id: &str, properties: Properties) -> Result<Page> {
        let mut pages = self.pages.lock().await;
        let page = pages
            .iter_mut()
            .find(|page| page.id == page_id)
            .ok_or_else(|| StoreError::Api {
                status: StatusCode::NOT_FOUND,
                message: format!("no page {page_id}"),
            })?;
        for (name, value) in properties.into_map() {
            page.properties.insert(name, value);
        }
        Ok(page.clone())
    }
}

fn unavailable() -> StoreError {
    StoreError::Api {
        status: StatusCode::SERVICE_UNAVAILABLE,
        message: "store down".into(),
    }
}

/// Store whose every operation fails.
#[derive(Clone, Copy, Default)]
pub struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    async fn query(&self, _filter: Filter) -> Result<Vec<Page>> {
        Err(unavailable())
    }

    async fn create_page(&self, _properties: Properties) -> Result<Page> {
        Err(unavailable())
    }

    async fn update_page(&self, _page_id: &str, _properties: Properties) -> Result<Page> {
        Err(unavailable())
    }
}

/// Store where reads fail but writes land in the wrapped [`MemoryStore`].
/// Exercises the fail-open paths: checks degrade, the write still happens.
#[derive(Clone, Default)]
pub struct QueryFailStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl DocumentStore for QueryFailStore {
    async fn query(&self, _filter: Filter) -> Result<Vec<Page>> {
        Err(unavailable())
    }

    async fn create_page(&self, properties: Properties) -> Result<Page> {
        self.inner.create_page(properties).await
    }

    async fn update_page(&self, page_id: &str, properties: Properties) -> Result<Page> {
        self.inner.update_page(page_id, properties).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_queries_by_filter() {
        let store = MemoryStore::new();
        store
            .seed(Properties::new().email("Email", "ana@x.com"))
            .await;
        store
            .seed(Properties::new().email("Email", "bob@x.com"))
            .await;

        let pages = store
            .query(Filter::email("Email", "ana@x.com"))
            .await
            .unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].email("Email"), Some("ana@x.com"));
    }

    #[tokio::test]
    async fn memory_store_update_merges_properties() {
        let store = MemoryStore::new();
        let page = store
            .seed(
                Properties::new()
                    .email("Email", "ana@x.com")
                    .select("Status", "registered"),
            )
            .await;

        let updated = store
            .update_page(&page.id, Properties::new().select("Status", "paid"))
            .await
            .unwrap();

        assert_eq!(updated.select("Status"), Some("paid"));
        assert_eq!(updated.email("Email"), Some("ana@x.com"));
    }

    #[tokio::test]
    async fn memory_store_update_unknown_page_errors() {
        let store = MemoryStore::new();
        let err = store
            .update_page("page-404", Properties::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Api { status, .. } if status == StatusCode::NOT_FOUND));
    }
}
