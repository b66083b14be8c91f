use std::fmt::Display;

/// Identity of a remote request; two requests with equal keys share one network call
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Free-text catalog search, one result page
    Search { text: String, page: u32 },
    /// Full detail record for one title id
    Detail(String),
    /// Trailer video id for a title
    Trailer(String),
}

impl CacheKey {
    /// Search text is case-insensitive upstream, so it is normalized here.
    pub fn search(text: &str, page: u32) -> Self {
        CacheKey::Search {
            text: text.trim().to_lowercase(),
            page,
        }
    }

    pub fn detail(id: &str) -> Self {
        CacheKey::Detail(id.trim().to_string())
    }

    pub fn trailer(title: &str) -> Self {
        CacheKey::Trailer(title.trim().to_lowercase())
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Search { text, page } => write!(f, "search:{}:{}", text, page),
            CacheKey::Detail(id) => write!(f, "detail:{}", id),
            CacheKey::Trailer(title) => write!(f, "trailer:{}", title),
        }
    }
}
