use serde::{Deserialize, Serialize};

/// Summary record returned by a catalog search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TitleSummary {
    pub id: String,
    pub title: String,
    pub year: Option<String>,
    pub poster_url: Option<String>,
}

/// One page of search results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SearchPage {
    pub items: Vec<TitleSummary>,
    pub total_pages: u32,
}

impl SearchPage {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A third-party rating, e.g. `Rotten Tomatoes: 87%`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rating {
    pub source: String,
    pub value: String,
}

/// Full detail record for one title
///
/// This is the source item of related-title aggregation: it is never mutated after being
/// resolved, a new id always produces a new record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TitleDetails {
    pub id: String,
    pub title: String,
    pub year: Option<String>,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
    pub director: Option<String>,
    pub writer: Option<String>,
    pub runtime: Option<String>,
    pub released: Option<String>,
    pub plot: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub awards: Option<String>,
    pub box_office: Option<String>,
    pub poster_url: Option<String>,
    pub imdb_rating: Option<String>,
    pub ratings: Vec<Rating>,
}

impl TitleDetails {
    pub fn primary_genre(&self) -> Option<&str> {
        self.genres
            .iter()
            .map(|g| g.trim())
            .find(|g| !g.is_empty())
    }

    /// Case-insensitive substring match against the genre field
    pub fn genre_matches(&self, target: &str) -> bool {
        let target = target.trim().to_lowercase();
        if target.is_empty() {
            return false;
        }
        self.genres.join(", ").to_lowercase().contains(&target)
    }

    /// Link to the title's IMDb page; `base` ends right before the id
    pub fn imdb_url(&self, base: &str) -> String {
        format!("{}{}", base, self.id)
    }
}

/// A related title proposed by aggregation or category browsing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub title: String,
    pub year: Option<String>,
    pub poster_url: Option<String>,
}

impl From<TitleSummary> for Candidate {
    fn from(summary: TitleSummary) -> Self {
        Candidate {
            id: summary.id,
            title: summary.title,
            year: summary.year,
            poster_url: summary.poster_url,
        }
    }
}
