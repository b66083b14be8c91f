use serde::Deserialize;

use crate::error::{FetchError, FetchResult};

pub mod title;

pub use title::{Candidate, Rating, SearchPage, TitleDetails, TitleSummary};

/// OMDb returns ten results per search page
pub const SEARCH_PAGE_SIZE: u32 = 10;

/// Placeholder OMDb uses for missing fields
const NOT_AVAILABLE: &str = "N/A";

/// OMDb error messages that mean "no results" rather than a failed request
const EMPTY_RESULT_ERRORS: [&str; 2] = ["Movie not found!", "Too many results."];

fn available(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != NOT_AVAILABLE)
}

/// Splits a comma-separated OMDb field such as `"Action, Comedy"`
fn split_list(value: Option<String>) -> Vec<String> {
    available(value)
        .map(|v| {
            v.split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn is_true(response: &str) -> bool {
    response.eq_ignore_ascii_case("true")
}

// ============================================================================
// OMDb API Types
// ============================================================================

/// Raw response from `GET /?s={text}&page={page}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiSearchResponse {
    pub response: String,
    #[serde(default)]
    pub search: Vec<ApiSearchItem>,
    #[serde(default, rename = "totalResults")]
    pub total_results: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSearchItem {
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Year", default)]
    pub year: Option<String>,
    #[serde(rename = "imdbID", default)]
    pub imdb_id: Option<String>,
    #[serde(rename = "Poster", default)]
    pub poster: Option<String>,
}

impl From<ApiSearchItem> for TitleSummary {
    fn from(item: ApiSearchItem) -> Self {
        TitleSummary {
            id: item.imdb_id.unwrap_or_default().trim().to_string(),
            title: item.title,
            year: available(item.year),
            poster_url: available(item.poster),
        }
    }
}

impl ApiSearchResponse {
    /// Converts the raw response into a page, treating "no results" errors as empty
    pub fn into_page(self) -> FetchResult<SearchPage> {
        if !is_true(&self.response) {
            let reason = self.error.unwrap_or_else(|| "Unknown error".to_string());
            if EMPTY_RESULT_ERRORS.contains(&reason.as_str()) {
                return Ok(SearchPage::empty());
            }
            return Err(FetchError::NetworkFailure(format!(
                "Catalog rejected search: {}",
                reason
            )));
        }

        let total_results = match self.total_results.as_deref().map(str::trim) {
            Some(raw) => raw.parse::<u32>().map_err(|e| {
                FetchError::MalformedPayload(format!("Invalid totalResults {:?}: {}", raw, e))
            })?,
            None => self.search.len() as u32,
        };

        Ok(SearchPage {
            items: self.search.into_iter().map(TitleSummary::from).collect(),
            total_pages: total_results.div_ceil(SEARCH_PAGE_SIZE),
        })
    }
}

/// Raw response from `GET /?i={id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiTitleDetails {
    pub response: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, rename = "imdbID")]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub actors: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub writer: Option<String>,
    #[serde(default)]
    pub runtime: Option<String>,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub plot: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub awards: Option<String>,
    #[serde(default)]
    pub box_office: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default, rename = "imdbRating")]
    pub imdb_rating: Option<String>,
    #[serde(default)]
    pub ratings: Vec<ApiRating>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiRating {
    pub source: String,
    pub value: String,
}

impl TryFrom<ApiTitleDetails> for TitleDetails {
    type Error = FetchError;

    fn try_from(details: ApiTitleDetails) -> FetchResult<Self> {
        if !is_true(&details.response) {
            return Err(FetchError::NotFound(
                details.error.unwrap_or_else(|| "Movie not found.".to_string()),
            ));
        }

        let id = available(details.imdb_id).ok_or_else(|| {
            FetchError::MalformedPayload("Detail response missing imdbID".to_string())
        })?;

        Ok(TitleDetails {
            id,
            title: available(details.title).unwrap_or_default(),
            year: available(details.year),
            genres: split_list(details.genre),
            actors: split_list(details.actors),
            director: available(details.director),
            writer: available(details.writer),
            runtime: available(details.runtime),
            released: available(details.released),
            plot: available(details.plot),
            language: available(details.language),
            country: available(details.country),
            awards: available(details.awards),
            box_office: available(details.box_office),
            poster_url: available(details.poster),
            imdb_rating: available(details.imdb_rating),
            ratings: details
                .ratings
                .into_iter()
                .map(|r| Rating {
                    source: r.source,
                    value: r.value,
                })
                .collect(),
        })
    }
}

// ============================================================================
// YouTube Data API Types
// ============================================================================

/// Raw response from `GET /search?type=video`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiVideoSearch {
    #[serde(default)]
    pub items: Vec<ApiVideoItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiVideoItem {
    pub id: ApiVideoId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiVideoId {
    #[serde(default)]
    pub video_id: Option<String>,
}

impl ApiVideoSearch {
    pub fn first_video_id(self) -> Option<String> {
        self.items
            .into_iter()
            .next()
            .and_then(|item| item.id.video_id)
            .filter(|id| !id.is_empty())
    }
}
