use serde::Deserialize;
use std::time::Duration;

use crate::cache::CancelPolicy;
use crate::services::related::RelatedOptions;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// OMDb API key
    pub omdb_api_key: String,

    /// OMDb API base URL
    #[serde(default = "default_omdb_api_url")]
    pub omdb_api_url: String,

    /// YouTube Data API key; trailer lookups report "no trailer" without it
    #[serde(default)]
    pub youtube_api_key: Option<String>,

    /// YouTube Data API base URL
    #[serde(default = "default_youtube_api_url")]
    pub youtube_api_url: String,

    /// Public YouTube results page used for manual-search fallback links
    #[serde(default = "default_youtube_search_url")]
    pub youtube_search_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Lifetime of a cached catalog response
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum number of cached responses per response type
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Per-request timeout for outgoing HTTP calls
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Number of related titles returned for one source title
    #[serde(default = "default_related_limit")]
    pub related_limit: usize,

    /// Upper bound on derived search phrases
    #[serde(default = "default_max_phrases")]
    pub max_phrases: usize,

    /// Maximum detail lookups when filtering candidates by category
    #[serde(default = "default_detail_fan_out")]
    pub detail_fan_out: usize,

    /// Extra result pages searched by the primary-genre fallback
    #[serde(default = "default_fallback_pages")]
    pub fallback_pages: u32,

    /// Only keep related titles in this genre; unset keeps every genre
    #[serde(default)]
    pub related_category: Option<String>,

    /// Prefix joined with a title id to link its IMDb page
    #[serde(default = "default_imdb_base_url")]
    pub imdb_base_url: String,

    /// Idle time after which a view session is dropped
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,

    /// Maximum number of open view sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Abort a coalesced request once every waiter has canceled
    #[serde(default)]
    pub abort_orphaned_requests: bool,
}

fn default_omdb_api_url() -> String {
    "https://www.omdbapi.com".to_string()
}

fn default_youtube_api_url() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

fn default_youtube_search_url() -> String {
    "https://www.youtube.com/results".to_string()
}

fn default_imdb_base_url() -> String {
    "https://www.imdb.com/title/".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_max_entries() -> usize {
    500
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_related_limit() -> usize {
    8
}

fn default_max_phrases() -> usize {
    crate::services::phrases::MAX_PHRASES
}

fn default_detail_fan_out() -> usize {
    20
}

fn default_fallback_pages() -> u32 {
    2
}

fn default_session_idle_secs() -> u64 {
    1800
}

fn default_max_sessions() -> usize {
    1000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    pub fn cancel_policy(&self) -> CancelPolicy {
        if self.abort_orphaned_requests {
            CancelPolicy::Abort
        } else {
            CancelPolicy::Detach
        }
    }

    pub fn related_options(&self) -> RelatedOptions {
        RelatedOptions {
            limit: self.related_limit,
            detail_fan_out: self.detail_fan_out,
            category: self
                .related_category
                .as_deref()
                .map(str::trim)
                .filter(|category| !category.is_empty())
                .map(str::to_string),
            fallback_pages: self.fallback_pages,
        }
    }
}
