use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::{
    error::FetchResult,
    models::Candidate,
    services::{
        catalog::Catalog,
        related::{filter_by_category, merge_candidates, search_all},
    },
};

/// Maximum titles shown for one category page
pub const BROWSE_LIMIT: usize = 30;

const TRENDING: &str = "trending";

/// Search phrases per category, in the order trending merges them
const CATEGORY_PHRASES: [(&str, &[&str]); 5] = [
    ("avengers", &["avengers"]),
    ("comedy", &["comedy", "funny movie", "slapstick", "romantic comedy"]),
    ("action", &["action", "action movie", "hero", "fight"]),
    ("romance", &["romance", "romantic", "romance movie", "love"]),
    ("emotional", &["emotional", "tearjerker", "family drama"]),
];

/// Genre a category's results must carry
const CATEGORY_GENRES: [(&str, &str); 4] = [
    ("comedy", "Comedy"),
    ("action", "Action"),
    ("romance", "Romance"),
    ("emotional", "Drama"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryPage {
    pub category: String,
    pub page: u32,
    pub items: Vec<Candidate>,
}

/// Browses curated categories built from several catalog searches
pub struct CategoryBrowser {
    catalog: Arc<Catalog>,
    limit: usize,
}

impl CategoryBrowser {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            limit: BROWSE_LIMIT,
        }
    }

    /// Search phrases for `category`; unknown categories search for themselves
    pub fn phrases(category: &str) -> Vec<String> {
        if category == TRENDING {
            let mut phrases: Vec<String> = Vec::new();
            for phrase in CATEGORY_PHRASES.iter().flat_map(|(_, p)| p.iter()) {
                if !phrases.iter().any(|p| p == phrase) {
                    phrases.push(phrase.to_string());
                }
            }
            return phrases;
        }

        CATEGORY_PHRASES
            .iter()
            .find(|(key, _)| *key == category)
            .map(|(_, phrases)| phrases.iter().map(|p| p.to_string()).collect())
            .unwrap_or_else(|| vec![category.to_string()])
    }

    /// Genre filter for `category`; trending and avengers are unfiltered
    pub fn genre_for(category: &str) -> Option<String> {
        if category == TRENDING || category == "avengers" {
            return None;
        }

        let genre = CATEGORY_GENRES
            .iter()
            .find(|(key, _)| *key == category)
            .map_or(category, |(_, genre)| *genre);
        Some(genre.to_string())
    }

    pub async fn browse(
        &self,
        category: &str,
        page: u32,
        cancel: &CancellationToken,
    ) -> FetchResult<CategoryPage> {
        let category = category.trim().to_lowercase();
        let page = page.max(1);
        if category.is_empty() {
            return Ok(CategoryPage {
                category,
                page,
                items: Vec::new(),
            });
        }

        let queries: Vec<(String, u32)> = Self::phrases(&category)
            .into_iter()
            .map(|phrase| (phrase, page))
            .collect();

        let contributions = search_all(&self.catalog, &queries, cancel).await?;
        let mut merged = merge_candidates(None, contributions);

        if let Some(genre) = Self::genre_for(&category) {
            merged = filter_by_category(&self.catalog, merged, &genre, self.limit, cancel).await?;
        }
        merged.truncate(self.limit);

        tracing::info!(
            category = %category,
            page = page,
            phrases = queries.len(),
            results = merged.len(),
            "Category browsed"
        );

        Ok(CategoryPage {
            category,
            page,
            items: merged.into_iter().map(Candidate::from).collect(),
        })
    }
}
