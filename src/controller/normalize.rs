use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

static ISBN_SHAPE: OnceLock<Regex> = OnceLock::new();

fn isbn_shape() -> &'static Regex {
    ISBN_SHAPE.get_or_init(|| {
        Regex::new(r"^(?:\d{13}|\d{9}[\dXx])$").expect("valid isbn pattern")
    })
}

/// A trimmed, non-empty query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedQuery(String);

impl NormalizedQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Input that trims to nothing. Callers treat this as a no-op, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("query is empty after trimming")]
pub struct Rejected;

/// Trim surrounding whitespace and reject empty input.
///
/// Shape checks (ISBN checksums, minimum length) are left to the lookup
/// service, which answers malformed queries with zero results or an error.
pub fn normalize(raw: &str) -> Result<NormalizedQuery, Rejected> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Rejected);
    }
    Ok(NormalizedQuery(trimmed.to_string()))
}

/// Bare digits when `query` is shaped like an ISBN-10 or ISBN-13.
///
/// Hyphens and spaces are ignored; a trailing `X` is accepted for ISBN-10.
/// Only the shape is checked, never the check digit.
pub fn isbn_candidate(query: &str) -> Option<String> {
    let compact: String = query
        .trim()
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect();

    if isbn_shape().is_match(&compact) {
        Some(compact.to_ascii_uppercase())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims() {
        let q = normalize("  The Great Gatsby \n").unwrap();
        assert_eq!(q.as_str(), "The Great Gatsby");
    }

    #[test]
    fn test_normalize_rejects_blank_input() {
        for raw in ["", " ", "\t\n", "\u{3000}"] {
            assert_eq!(normalize(raw), Err(Rejected), "input {:?}", raw);
        }
    }

    #[test]
    fn test_normalize_keeps_malformed_queries() {
        assert_eq!(normalize("isbn:000").unwrap().as_str(), "isbn:000");
        assert_eq!(normalize("x").unwrap().as_str(), "x");
    }

    #[test]
    fn test_isbn_candidate_shapes() {
        assert_eq!(
            isbn_candidate("978-0-451-52493-5").as_deref(),
            Some("9780451524935")
        );
        assert_eq!(isbn_candidate("0 8044 2957 x").as_deref(), Some("080442957X"));
        assert_eq!(isbn_candidate("9780451524935").as_deref(), Some("9780451524935"));
        assert_eq!(isbn_candidate("12345"), None);
        assert_eq!(isbn_candidate("isbn:9780451524935"), None);
        assert_eq!(isbn_candidate("Gatsby"), None);
    }
}
