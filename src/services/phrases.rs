use crate::{
    error::{FetchError, FetchResult},
    models::TitleDetails,
};

/// Default upper bound on derived phrases
pub const MAX_PHRASES: usize = 6;

const GENRE_PHRASES: usize = 2;
const ACTOR_PHRASES: usize = 2;
const TITLE_WORD_PHRASES: usize = 3;
/// Title words must be longer than this to be worth searching for
const MIN_TITLE_WORD_LEN: usize = 3;

/// Separators between an actor's name and a role annotation, e.g. `"Jane Doe (voice)"`
const ROLE_SEPARATORS: [&str; 3] = [" as ", " (", " - "];

/// Derives free-text search phrases likely to surface titles related to a source title
///
/// Priority order: genres, lead actors, director, significant title words. Earlier phrases
/// rank their results earlier downstream.
#[derive(Debug, Clone, Copy)]
pub struct PhraseDeriver {
    max_phrases: usize,
}

impl Default for PhraseDeriver {
    fn default() -> Self {
        Self::new(MAX_PHRASES)
    }
}

impl PhraseDeriver {
    pub fn new(max_phrases: usize) -> Self {
        Self {
            max_phrases: max_phrases.max(1),
        }
    }

    /// Returns the ordered, distinct phrases for `item`
    ///
    /// # Errors
    ///
    /// [`FetchError::NotApplicable`] when nothing searchable can be derived.
    pub fn derive(&self, item: &TitleDetails) -> FetchResult<Vec<String>> {
        let mut phrases = Phrases::new(self.max_phrases);

        for genre in item.genres.iter().take(GENRE_PHRASES) {
            phrases.push(genre);
        }

        for actor in item.actors.iter().take(ACTOR_PHRASES) {
            phrases.push(actor_name(actor));
        }

        if let Some(director) = item.director.as_deref().and_then(primary_director) {
            phrases.push(director);
        }

        let title_words = item
            .title
            .split_whitespace()
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|word| word.chars().count() > MIN_TITLE_WORD_LEN)
            .take(TITLE_WORD_PHRASES);
        for word in title_words {
            phrases.push(word);
        }

        let phrases = phrases.into_inner();
        if phrases.is_empty() {
            tracing::debug!(title_id = %item.id, "No search phrases derivable");
            return Err(FetchError::NotApplicable);
        }

        tracing::debug!(title_id = %item.id, phrases = ?phrases, "Derived search phrases");
        Ok(phrases)
    }
}

/// Ordered, case-sensitively distinct, capped phrase list
struct Phrases {
    items: Vec<String>,
    cap: usize,
}

impl Phrases {
    fn new(cap: usize) -> Self {
        Self {
            items: Vec::with_capacity(cap),
            cap,
        }
    }

    fn push(&mut self, raw: &str) {
        let phrase = raw.trim();
        if phrase.is_empty() || self.items.len() >= self.cap {
            return;
        }
        if !self.items.iter().any(|existing| existing == phrase) {
            self.items.push(phrase.to_string());
        }
    }

    fn into_inner(self) -> Vec<String> {
        self.items
    }
}

/// The part of an actor credit before any role annotation
fn actor_name(credit: &str) -> &str {
    ROLE_SEPARATORS
        .iter()
        .filter_map(|sep| credit.find(sep))
        .min()
        .map_or(credit, |idx| &credit[..idx])
        .trim()
}

fn primary_director(directors: &str) -> Option<&str> {
    directors
        .split(',')
        .map(str::trim)
        .find(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, genres: &[&str], actors: &[&str], director: Option<&str>) -> TitleDetails {
        TitleDetails {
            id: "tt1".to_string(),
            title: title.to_string(),
            genres: genres.iter().map(|s| s.to_string()).collect(),
            actors: actors.iter().map(|s| s.to_string()).collect(),
            director: director.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_priority_order() {
        let source = item(
            "Heat",
            &["Action", "Crime", "Drama"],
            &["Al Pacino", "Robert De Niro", "Val Kilmer"],
            Some("Michael Mann"),
        );

        let phrases = PhraseDeriver::default().derive(&source).unwrap();
        assert_eq!(
            phrases,
            vec![
                "Action",
                "Crime",
                "Al Pacino",
                "Robert De Niro",
                "Michael Mann",
                "Heat"
            ]
        );
    }

    #[test]
    fn test_cap_stops_collection() {
        let source = item(
            "The Great Escape Artists",
            &["Action", "Comedy"],
            &["Steve McQueen", "James Garner"],
            Some("John Sturges"),
        );

        let phrases = PhraseDeriver::default().derive(&source).unwrap();
        assert_eq!(phrases.len(), MAX_PHRASES);
        assert_eq!(phrases.last().map(String::as_str), Some("Great"));

        let short = PhraseDeriver::new(2).derive(&source).unwrap();
        assert_eq!(short, vec!["Action", "Comedy"]);
    }

    #[test]
    fn test_title_words_only_when_long_enough() {
        let source = item("The Great Escape", &[], &[], None);

        let phrases = PhraseDeriver::default().derive(&source).unwrap();
        assert_eq!(phrases, vec!["Great", "Escape"]);
    }

    #[test]
    fn test_title_words_strip_punctuation() {
        let source = item("Mission: Impossible", &[], &[], None);

        let phrases = PhraseDeriver::default().derive(&source).unwrap();
        assert_eq!(phrases, vec!["Mission", "Impossible"]);
    }

    #[test]
    fn test_actor_role_is_dropped() {
        let source = item(
            "Up",
            &[],
            &["Ed Asner (voice)", "Jordan Nagai as Russell"],
            None,
        );

        let phrases = PhraseDeriver::default().derive(&source).unwrap();
        assert_eq!(phrases, vec!["Ed Asner", "Jordan Nagai"]);
    }

    #[test]
    fn test_primary_director_only() {
        let source = item("Up", &[], &[], Some("Pete Docter, Bob Peterson"));

        let phrases = PhraseDeriver::default().derive(&source).unwrap();
        assert_eq!(phrases, vec!["Pete Docter"]);
    }

    #[test]
    fn test_duplicates_are_dropped_case_sensitively() {
        let source = item("Drama", &["Drama", "drama"], &[], None);

        let phrases = PhraseDeriver::default().derive(&source).unwrap();
        assert_eq!(phrases, vec!["Drama", "drama"]);
    }

    #[test]
    fn test_blank_entries_are_skipped() {
        let source = item("It", &["  ", "Horror"], &[""], Some(" "));

        let phrases = PhraseDeriver::default().derive(&source).unwrap();
        assert_eq!(phrases, vec!["Horror"]);
    }

    #[test]
    fn test_nothing_to_search_is_not_applicable() {
        let source = item("Up in the Air", &[], &[], None);

        assert_eq!(
            PhraseDeriver::default().derive(&source),
            Err(FetchError::NotApplicable)
        );
    }
}
