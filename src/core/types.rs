use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A single lookup result as returned by the book-metadata service.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Book {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    /// Raw date string as the service reports it: `1925`, `1925-04` or `1925-04-10`.
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub isbn_10: Option<String>,
    #[serde(default)]
    pub isbn_13: Option<String>,
    #[serde(default)]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub ratings_count: Option<u32>,
}

impl Book {
    /// Preferred identifier for display and dedup: ISBN-13, then ISBN-10.
    pub fn isbn(&self) -> Option<&str> {
        self.isbn_13.as_deref().or(self.isbn_10.as_deref())
    }

    pub fn published_year(&self) -> Option<i32> {
        let raw = self.published_date.as_deref()?.trim();
        if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(date.year());
        }
        // Partial dates ("1925", "1925-04") only carry a reliable year prefix.
        raw.get(..4).and_then(|y| y.parse::<i32>().ok())
    }

    pub fn author_line(&self) -> String {
        match self.authors.as_slice() {
            [] => "Unknown author".to_string(),
            [one] => one.clone(),
            [first, second] => format!("{} & {}", first, second),
            [first, rest @ ..] => format!("{} and {} others", first, rest.len()),
        }
    }
}

/// Ordering requested from the lookup service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOption {
    #[default]
    Relevance,
    Newest,
    Popularity,
}

impl SortOption {
    pub const ALL: [SortOption; 3] = [
        SortOption::Relevance,
        SortOption::Newest,
        SortOption::Popularity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortOption::Relevance => "relevance",
            SortOption::Newest => "newest",
            SortOption::Popularity => "popularity",
        }
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown sort option '{0}' (expected relevance, newest or popularity)")]
pub struct UnknownSortOption(pub String);

impl FromStr for SortOption {
    type Err = UnknownSortOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|opt| opt.as_str() == wanted)
            .ok_or_else(|| UnknownSortOption(s.trim().to_string()))
    }
}

/// Snapshot of the user-controlled lookup parameters.
///
/// Copied into every attempt when it is issued, so later edits never leak into
/// a request that is already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct QueryParameters {
    pub sort_by: SortOption,
    pub include_translations: bool,
}

impl QueryParameters {
    pub fn new(sort_by: SortOption, include_translations: bool) -> Self {
        Self {
            sort_by,
            include_translations,
        }
    }
}

/// Outcome of one barcode scan session, produced by the external scanner.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanEvent {
    pub code: String,
    pub outcome: ScanOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// The scanner's own lookup finished; the list may be empty.
    Success(Vec<Book>),
    Failure(String),
}

impl ScanEvent {
    pub fn success(code: impl Into<String>, items: Vec<Book>) -> Self {
        Self {
            code: code.into(),
            outcome: ScanOutcome::Success(items),
        }
    }

    pub fn failure(code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            outcome: ScanOutcome::Failure(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_option_parses_case_insensitively() {
        assert_eq!("Newest".parse::<SortOption>(), Ok(SortOption::Newest));
        assert_eq!(" popularity ".parse::<SortOption>(), Ok(SortOption::Popularity));
        assert_eq!(
            "rating".parse::<SortOption>(),
            Err(UnknownSortOption("rating".to_string()))
        );
    }

    #[test]
    fn test_published_year_handles_partial_dates() {
        let mut book = Book {
            published_date: Some("1925-04-10".into()),
            ..Default::default()
        };
        assert_eq!(book.published_year(), Some(1925));

        book.published_date = Some("2004-06".into());
        assert_eq!(book.published_year(), Some(2004));

        book.published_date = Some("1949".into());
        assert_eq!(book.published_year(), Some(1949));

        book.published_date = Some("n.d.".into());
        assert_eq!(book.published_year(), None);
    }

    #[test]
    fn test_author_line() {
        let mut book = Book::default();
        assert_eq!(book.author_line(), "Unknown author");

        book.authors = vec!["Terry Pratchett".into(), "Neil Gaiman".into()];
        assert_eq!(book.author_line(), "Terry Pratchett & Neil Gaiman");

        book.authors.push("Someone Else".into());
        assert_eq!(book.author_line(), "Terry Pratchett and 2 others");
    }

    #[test]
    fn test_isbn_prefers_thirteen_digits() {
        let book = Book {
            isbn_10: Some("0451524934".into()),
            isbn_13: Some("9780451524935".into()),
            ..Default::default()
        };
        assert_eq!(book.isbn(), Some("9780451524935"));
    }
}
