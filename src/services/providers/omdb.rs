/// OMDb catalog provider
///
/// API Flow:
/// 1. Search: `/?s={text}&page={page}&type=movie` → summaries with IMDb ids
/// 2. Detail: `/?i={imdb_id}` → full record (genre, actors, director, ratings)
///
/// OMDb answers errors with HTTP 200 and `"Response": "False"`, so the body decides
/// between an empty page, a not-found and a real failure.
use crate::{
    error::{FetchError, FetchResult},
    models::{ApiSearchResponse, ApiTitleDetails, SearchPage, TitleDetails},
    services::providers::CatalogProvider,
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::time::Duration;

const CONTENT_TYPE: &str = "movie";

#[derive(Clone)]
pub struct OmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl OmdbProvider {
    pub fn new(api_key: String, api_url: String, timeout: Duration) -> FetchResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/", self.api_url.trim_end_matches('/'))
    }

    /// Issues one GET against the OMDb endpoint and decodes the body
    async fn get<T: DeserializeOwned>(&self, query: &[(&str, &str)]) -> FetchResult<T> {
        let response = self
            .http_client
            .get(self.endpoint())
            .query(&[("apikey", self.api_key.as_str()), ("type", CONTENT_TYPE)])
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body,
                provider = "omdb",
                "Catalog request failed"
            );
            return Err(FetchError::NetworkFailure(format!(
                "OMDb returned status {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, response = %body, "Failed to deserialize OMDb response");
            FetchError::MalformedPayload(format!("Failed to parse OMDb response: {}", e))
        })
    }
}

#[async_trait::async_trait]
impl CatalogProvider for OmdbProvider {
    async fn search(&self, text: &str, page: u32) -> FetchResult<SearchPage> {
        let page_param = page.max(1).to_string();
        let response: ApiSearchResponse = self
            .get(&[("s", text), ("page", page_param.as_str())])
            .await?;
        let page = response.into_page()?;

        tracing::info!(
            query = %text,
            page = %page_param,
            results = page.items.len(),
            provider = "omdb",
            "Title search completed"
        );

        Ok(page)
    }

    async fn detail(&self, id: &str) -> FetchResult<TitleDetails> {
        let response: ApiTitleDetails = self.get(&[("i", id)]).await?;
        let details = TitleDetails::try_from(response)?;

        tracing::info!(
            title_id = %details.id,
            genres = details.genres.len(),
            provider = "omdb",
            "Title detail fetched"
        );

        Ok(details)
    }

    fn name(&self) -> &'static str {
        "omdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_provider(api_url: &str) -> OmdbProvider {
        OmdbProvider::new(
            "test_key".to_string(),
            api_url.to_string(),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_normalizes_trailing_slash() {
        assert_eq!(
            create_test_provider("http://test.local/").endpoint(),
            "http://test.local/"
        );
        assert_eq!(
            create_test_provider("http://test.local").endpoint(),
            "http://test.local/"
        );
    }

    #[tokio::test]
    async fn test_unreachable_catalog_is_a_network_failure() {
        // Port 9 (discard) on localhost is not expected to accept HTTP connections
        let provider = create_test_provider("http://127.0.0.1:9");

        let result = provider.search("matrix", 1).await;
        assert!(matches!(result, Err(FetchError::NetworkFailure(_))));
    }
}
