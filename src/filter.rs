// Query filtering for expense listings and summaries

use std::fmt;

/// Inclusive date range over `YYYY-MM-DD` strings
///
/// Bounds are compared lexicographically, the same way SQLite compares TEXT
/// columns, so no calendar validation happens here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Whether `date` falls inside `[start, end]`
    pub fn contains(&self, date: &str) -> bool {
        self.start.as_str() <= date && date <= self.end.as_str()
    }

    pub(crate) fn where_clause(&self) -> (String, Vec<String>) {
        (
            "date BETWEEN ?1 AND ?2".to_string(),
            vec![self.start.clone(), self.end.clone()],
        )
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Filter for the summarize query: a date range plus an optional category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryFilter {
    pub range: DateRange,
    pub category: Option<String>,
}

impl SummaryFilter {
    pub fn new(range: DateRange) -> Self {
        Self { range, category: None }
    }

    /// Restrict to one category. An empty string means no restriction.
    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category.filter(|c| !c.is_empty());
        self
    }

    pub(crate) fn where_clause(&self) -> (String, Vec<String>) {
        let (mut clause, mut params) = self.range.where_clause();
        if let Some(category) = &self.category {
            clause.push_str(&format!(" AND category = ?{}", params.len() + 1));
            params.push(category.clone());
        }
        (clause, params)
    }
}
