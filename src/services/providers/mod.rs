/// Remote data provider abstraction
///
/// This module provides a pluggable boundary for the remote APIs the crate consumes: a
/// catalog (text search and detail by id) and a video lookup used for trailers. Callers
/// never talk to a provider directly; every call is routed through a `QueryClient` so it
/// is cached and coalesced.
use crate::{
    error::FetchResult,
    models::{SearchPage, TitleDetails},
};

pub mod omdb;
pub mod youtube;

pub use omdb::OmdbProvider;
pub use youtube::YoutubeProvider;

/// Trait for catalog providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Search titles by free text
    ///
    /// "No results" is an empty page, not an error.
    async fn search(&self, text: &str, page: u32) -> FetchResult<SearchPage>;

    /// Fetch the full detail record for one title id
    async fn detail(&self, id: &str) -> FetchResult<TitleDetails>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Trait for video lookup providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait VideoProvider: Send + Sync {
    /// Find the single best trailer video id for a title, if any
    async fn find_trailer(&self, title: &str) -> FetchResult<Option<String>>;

    fn name(&self) -> &'static str;
}
