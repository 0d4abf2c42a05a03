use serde::Serialize;
use thiserror::Error;

use crate::record::Record;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 500;

pub const BOND_SEARCH_FIELDS: &[&str] = &["issuer_name", "isin"];
pub const MESSAGE_SEARCH_FIELDS: &[&str] = &["name", "email", "message"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Validated 1-indexed page window.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PageRequest {
    page: usize,
    page_size: usize,
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Result<Self, QueryError> {
        if page < 1 {
            return Err(QueryError::InvalidArgument(format!(
                "page must be at least 1, got {page}"
            )));
        }
        if page_size < 1 {
            return Err(QueryError::InvalidArgument(format!(
                "page size must be at least 1, got {page_size}"
            )));
        }
        if page_size > MAX_PAGE_SIZE {
            return Err(QueryError::InvalidArgument(format!(
                "page size must be at most {MAX_PAGE_SIZE}, got {page_size}"
            )));
        }
        Ok(Self {
            page: page as usize,
            page_size: page_size as usize,
        })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE as usize,
            page_size: DEFAULT_PAGE_SIZE as usize,
        }
    }
}

/// Exact, case-insensitive membership test on one field.
#[derive(Clone, Debug, Default)]
pub struct Facet {
    pub field: String,
    pub values: Vec<String>,
}

impl Facet {
    pub fn new(field: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            field: field.into(),
            values: values.into_iter().map(|value| value.trim().to_lowercase()).collect(),
        }
    }

    fn matches(&self, record: &Record) -> bool {
        if self.values.is_empty() {
            return true;
        }
        let Some(actual) = record.get(&self.field) else {
            return false;
        };
        let actual = actual.trim().to_lowercase();
        self.values.iter().any(|value| *value == actual)
    }
}

#[derive(Clone, Debug)]
pub struct SearchQuery {
    term: String,
    fields: Vec<String>,
    facets: Vec<Facet>,
}

impl SearchQuery {
    /// Substring search over `issuer_name` and `isin`.
    pub fn bonds(term: &str) -> Self {
        Self::over(term, BOND_SEARCH_FIELDS)
    }

    pub fn messages(term: &str) -> Self {
        Self::over(term, MESSAGE_SEARCH_FIELDS)
    }

    pub fn over(term: &str, fields: &[&str]) -> Self {
        Self {
            term: term.trim().to_lowercase(),
            fields: fields.iter().map(|field| field.to_string()).collect(),
            facets: Vec::new(),
        }
    }

    pub fn with_facet(mut self, facet: Facet) -> Self {
        if !facet.values.is_empty() {
            self.facets.push(facet);
        }
        self
    }

    fn matches(&self, record: &Record) -> bool {
        let term_matches = self.term.is_empty()
            || self.fields.iter().any(|field| {
                record
                    .get(field)
                    .map(|value| value.to_lowercase().contains(&self.term))
                    .unwrap_or(false)
            });
        term_matches && self.facets.iter().all(|facet| facet.matches(record))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Page {
    pub items: Vec<Record>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Filters, orders newest-first (reverse insertion), and slices one page.
/// The input is never modified.
pub fn query(records: &[Record], search: &SearchQuery, page: PageRequest) -> Page {
    let filtered: Vec<&Record> = records
        .iter()
        .rev()
        .filter(|record| search.matches(record))
        .collect();
    let total = filtered.len();
    let items = filtered
        .into_iter()
        .skip(page.offset())
        .take(page.page_size())
        .cloned()
        .collect();
    Page {
        items,
        total,
        page: page.page(),
        page_size: page.page_size(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bond(id: &str, issuer: &str, isin: &str) -> Record {
        [("id", id), ("issuer_name", issuer), ("isin", isin)]
            .into_iter()
            .collect()
    }

    #[test]
    fn rejects_non_positive_page() {
        assert!(PageRequest::new(0, 10).is_err());
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(1, -5).is_err());
    }

    #[test]
    fn isin_match_is_enough() {
        let bonds = vec![bond("1", "Alpha", "IN001"), bond("2", "Beta", "US999")];
        let page = query(&bonds, &SearchQuery::bonds("us9"), PageRequest::default());
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id(), Some("2"));
    }
}
