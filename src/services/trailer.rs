use reqwest::Url;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::{
    cache::{CacheKey, CancelPolicy, QueryClient},
    cached,
    error::{FetchError, FetchResult},
    services::providers::VideoProvider,
};

/// Result of asking for a title's trailer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrailerOutcome {
    /// The user has to sign in first; the lookup runs once they do
    SignInRequired,
    Ready { video_id: String },
    /// The lookup found nothing; the link opens a manual search
    NotFound { search_url: String },
    /// The lookup failed; the link opens a manual search
    Unavailable { search_url: String },
}

/// Cached trailer lookups
pub struct TrailerService {
    provider: Arc<dyn VideoProvider>,
    lookups: QueryClient<CacheKey, Option<String>>,
    search_url: String,
}

impl TrailerService {
    pub fn new(
        provider: Arc<dyn VideoProvider>,
        search_url: String,
        max_entries: usize,
        ttl: Duration,
        cancel_policy: CancelPolicy,
    ) -> Self {
        Self {
            provider,
            lookups: QueryClient::new("trailer", max_entries, ttl, cancel_policy),
            search_url,
        }
    }

    /// Manual search link for `"{title} trailer"`
    pub fn search_url(&self, title: &str) -> String {
        let query = format!("{} trailer", title.trim());
        match Url::parse_with_params(&self.search_url, &[("search_query", query.trim())]) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, url = %self.search_url, "Invalid video search URL");
                self.search_url.clone()
            }
        }
    }

    /// Looks up the trailer for `title`
    ///
    /// Lookup failures degrade to a manual search link; only cancellation is an error.
    pub async fn lookup(
        &self,
        title: &str,
        cancel: &CancellationToken,
    ) -> FetchResult<TrailerOutcome> {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Ok(TrailerOutcome::Unavailable {
                search_url: self.search_url(""),
            });
        }

        let provider = Arc::clone(&self.provider);
        let key = CacheKey::trailer(&title);
        let query = title.clone();
        let found = cached!(self.lookups, key, cancel, async move {
            provider.find_trailer(&query).await
        });

        match found {
            Ok(Some(video_id)) => Ok(TrailerOutcome::Ready { video_id }),
            Ok(None) => Ok(TrailerOutcome::NotFound {
                search_url: self.search_url(&title),
            }),
            Err(FetchError::Canceled) => Err(FetchError::Canceled),
            Err(e) => {
                tracing::warn!(
                    title = %title,
                    provider = self.provider.name(),
                    error = %e,
                    "Trailer lookup failed"
                );
                Ok(TrailerOutcome::Unavailable {
                    search_url: self.search_url(&title),
                })
            }
        }
    }
}
