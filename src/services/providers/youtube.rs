/// YouTube Data API video lookup
///
/// Searches `"{title} trailer"` and keeps only the first video hit.
use crate::{
    error::{FetchError, FetchResult},
    models::ApiVideoSearch,
    services::providers::VideoProvider,
};
use reqwest::Client as HttpClient;
use std::time::Duration;

#[derive(Clone)]
pub struct YoutubeProvider {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
}

impl YoutubeProvider {
    pub fn new(api_key: Option<String>, api_url: String, timeout: Duration) -> FetchResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_url,
        })
    }
}

#[async_trait::async_trait]
impl VideoProvider for YoutubeProvider {
    async fn find_trailer(&self, title: &str) -> FetchResult<Option<String>> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!("YOUTUBE_API_KEY not set, trailer lookup skipped");
            return Ok(None);
        };

        let title = title.trim();
        if title.is_empty() {
            return Ok(None);
        }

        let query = format!("{} trailer", title);
        let url = format!("{}/search", self.api_url.trim_end_matches('/'));

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", "1"),
                ("q", query.as_str()),
                ("key", api_key),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!(status = %status, provider = "youtube", "Video lookup failed");
            return Err(FetchError::NetworkFailure(format!(
                "YouTube returned status {}",
                status
            )));
        }

        let search: ApiVideoSearch = response.json().await?;
        let video_id = search.first_video_id();

        tracing::info!(
            title = %title,
            found = video_id.is_some(),
            provider = "youtube",
            "Trailer lookup completed"
        );

        Ok(video_id)
    }

    fn name(&self) -> &'static str {
        "youtube"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_reports_no_trailer() {
        let provider = YoutubeProvider::new(
            None,
            "http://test.local".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(provider.find_trailer("Inception").await, Ok(None));
    }

    #[tokio::test]
    async fn test_blank_key_counts_as_missing() {
        let provider = YoutubeProvider::new(
            Some("  ".to_string()),
            "http://test.local".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(provider.find_trailer("Inception").await, Ok(None));
    }
}
