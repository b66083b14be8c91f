use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::{
    cache::{CacheKey, CancelPolicy, QueryClient},
    cached,
    error::{FetchError, FetchResult},
    models::{SearchPage, TitleDetails},
    services::providers::CatalogProvider,
};

/// Cached, coalescing facade over a [`CatalogProvider`]
///
/// Built once at startup and shared by every consumer, so identical searches and detail
/// lookups issued anywhere in the process resolve to a single network call.
pub struct Catalog {
    provider: Arc<dyn CatalogProvider>,
    searches: QueryClient<CacheKey, SearchPage>,
    details: QueryClient<CacheKey, TitleDetails>,
}

impl Catalog {
    pub fn new(
        provider: Arc<dyn CatalogProvider>,
        max_entries: usize,
        ttl: Duration,
        cancel_policy: CancelPolicy,
    ) -> Self {
        Self {
            provider,
            searches: QueryClient::new("search", max_entries, ttl, cancel_policy),
            details: QueryClient::new("detail", max_entries, ttl, cancel_policy),
        }
    }

    /// One page of free-text search results; blank text yields an empty page
    pub async fn search(
        &self,
        text: &str,
        page: u32,
        cancel: &CancellationToken,
    ) -> FetchResult<SearchPage> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Ok(SearchPage::empty());
        }
        let page = page.max(1);

        let provider = Arc::clone(&self.provider);
        cached!(self.searches, CacheKey::search(&text, page), cancel, async move {
            provider.search(&text, page).await
        })
    }

    /// Full detail record for `id`
    pub async fn detail(&self, id: &str, cancel: &CancellationToken) -> FetchResult<TitleDetails> {
        let id = id.trim().to_string();
        if id.is_empty() {
            return Err(FetchError::NotFound("Movie id missing.".to_string()));
        }

        let provider = Arc::clone(&self.provider);
        cached!(self.details, CacheKey::detail(&id), cancel, async move {
            provider.detail(&id).await
        })
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Number of searches and detail lookups currently on the wire
    pub fn in_flight(&self) -> usize {
        self.searches.in_flight_len() + self.details.in_flight_len()
    }

    pub fn clear_cache(&self) {
        self.searches.clear();
        self.details.clear();
    }
}
