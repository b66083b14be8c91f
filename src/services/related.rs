use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{FetchError, FetchResult},
    models::{Candidate, TitleDetails, TitleSummary},
    services::catalog::Catalog,
};

/// Tuning for related-title aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedOptions {
    /// Maximum number of candidates returned
    pub limit: usize,
    /// Maximum detail lookups performed by the category filter
    pub detail_fan_out: usize,
    /// Keep only candidates whose genre field contains this token
    pub category: Option<String>,
    /// Extra result pages searched by the primary-genre fallback
    pub fallback_pages: u32,
}

impl Default for RelatedOptions {
    fn default() -> Self {
        Self {
            limit: 8,
            detail_fan_out: 20,
            category: None,
            fallback_pages: 2,
        }
    }
}

/// Builds a related-titles list for a source title out of plain catalog searches
///
/// Each derived phrase becomes one search; results are merged in phrase order, the source
/// itself and duplicates are dropped, an optional category filter is applied, and the list
/// is truncated. A phrase whose search fails simply contributes nothing.
pub struct RelatedPipeline {
    catalog: Arc<Catalog>,
    options: RelatedOptions,
}

impl RelatedPipeline {
    pub fn new(catalog: Arc<Catalog>, options: RelatedOptions) -> Self {
        Self { catalog, options }
    }

    pub fn options(&self) -> &RelatedOptions {
        &self.options
    }

    /// Same pipeline over the same catalog, filtering by `category` instead
    pub fn with_category(&self, category: Option<String>) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            options: RelatedOptions {
                category,
                ..self.options.clone()
            },
        }
    }

    /// Runs the pipeline for `source` using `phrases` in priority order
    pub async fn aggregate(
        &self,
        source: &TitleDetails,
        phrases: &[String],
        cancel: &CancellationToken,
    ) -> FetchResult<Vec<Candidate>> {
        let queries: Vec<(String, u32)> = phrases.iter().map(|p| (p.clone(), 1)).collect();
        let candidates = self.collect(&queries, &source.id, cancel).await?;

        if !candidates.is_empty() {
            tracing::info!(
                title_id = %source.id,
                phrases = phrases.len(),
                candidates = candidates.len(),
                "Related titles aggregated"
            );
            return Ok(candidates);
        }

        let Some(genre) = source.primary_genre() else {
            tracing::info!(title_id = %source.id, "No related titles found");
            return Ok(candidates);
        };

        tracing::info!(
            title_id = %source.id,
            genre = %genre,
            pages = self.options.fallback_pages + 1,
            "No related titles, retrying with primary genre"
        );

        let fallback: Vec<(String, u32)> = (1..=self.options.fallback_pages + 1)
            .map(|page| (genre.to_string(), page))
            .collect();
        self.collect(&fallback, &source.id, cancel).await
    }

    async fn collect(
        &self,
        queries: &[(String, u32)],
        source_id: &str,
        cancel: &CancellationToken,
    ) -> FetchResult<Vec<Candidate>> {
        let contributions = search_all(&self.catalog, queries, cancel).await?;
        let mut merged = merge_candidates(Some(source_id), contributions);

        if let Some(category) = self.options.category.as_deref() {
            merged = filter_by_category(
                &self.catalog,
                merged,
                category,
                self.options.detail_fan_out,
                cancel,
            )
            .await?;
        }

        merged.truncate(self.options.limit);
        Ok(merged.into_iter().map(Candidate::from).collect())
    }
}

/// Issues every `(phrase, page)` search concurrently
///
/// A failed search is an empty contribution. The call only fails when every search failed,
/// returning the last failure, or when the caller canceled.
pub async fn search_all(
    catalog: &Catalog,
    queries: &[(String, u32)],
    cancel: &CancellationToken,
) -> FetchResult<Vec<Vec<TitleSummary>>> {
    let results = join_all(
        queries
            .iter()
            .map(|(phrase, page)| catalog.search(phrase, *page, cancel)),
    )
    .await;

    let mut contributions = Vec::with_capacity(results.len());
    let mut failures = 0;
    let mut last_error = None;

    for ((phrase, page), result) in queries.iter().zip(results) {
        match result {
            Ok(found) => contributions.push(found.items),
            Err(FetchError::Canceled) => return Err(FetchError::Canceled),
            Err(e) => {
                tracing::warn!(
                    phrase = %phrase,
                    page = page,
                    error = %e,
                    "Phrase search failed, treating as empty"
                );
                contributions.push(Vec::new());
                failures += 1;
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if failures == queries.len() => Err(e),
        _ => Ok(contributions),
    }
}

/// Flattens contributions in order, dropping blank ids, `exclude`, and repeats
pub fn merge_candidates(
    exclude: Option<&str>,
    contributions: Vec<Vec<TitleSummary>>,
) -> Vec<TitleSummary> {
    let mut seen = HashSet::new();

    contributions
        .into_iter()
        .flatten()
        .filter(|summary| !summary.id.is_empty())
        .filter(|summary| exclude != Some(summary.id.as_str()))
        .filter(|summary| seen.insert(summary.id.clone()))
        .collect()
}

/// Keeps candidates whose detail record lists `target` among its genres
///
/// Only the first `fan_out` candidates are looked up; a failed lookup drops the candidate.
pub async fn filter_by_category(
    catalog: &Catalog,
    candidates: Vec<TitleSummary>,
    target: &str,
    fan_out: usize,
    cancel: &CancellationToken,
) -> FetchResult<Vec<TitleSummary>> {
    let pool: Vec<TitleSummary> = candidates.into_iter().take(fan_out).collect();
    let details = join_all(pool.iter().map(|c| catalog.detail(&c.id, cancel))).await;

    let mut kept = Vec::with_capacity(pool.len());
    for (candidate, detail) in pool.into_iter().zip(details) {
        match detail {
            Ok(detail) if detail.genre_matches(target) => kept.push(candidate),
            Ok(_) => {}
            Err(FetchError::Canceled) => return Err(FetchError::Canceled),
            Err(e) => {
                tracing::debug!(
                    title_id = %candidate.id,
                    error = %e,
                    "Dropping candidate without detail"
                );
            }
        }
    }

    tracing::debug!(category = %target, kept = kept.len(), "Category filter applied");
    Ok(kept)
}
