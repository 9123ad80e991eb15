//! Search request parsing and validation
//!
//! Handles the query-string contract shared by every catalog search endpoint:
//! - Control parameters (`query`, `page`, `size`, `sort`, `order`, `types`)
//! - Everything else is a filter; repeated keys are merged as a comma list
//!
//! The parsed request is already normalized: two query strings that parse to
//! equal `SearchRequest`s produce identical index requests.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Parameter names that never become filters.
pub const RESERVED_PARAMS: &[&str] = &["query", "page", "size", "sort", "order", "types"];

/// Sort direction requested by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Paging bounds, normally taken from server configuration.
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default_size: usize,
    pub max_size: usize,
    /// Deepest hit reachable with `from + size` (the index `max_result_window`).
    pub max_result_window: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_size: 10,
            max_size: 100,
            max_result_window: 10_000,
        }
    }
}

/// One filter key with every value supplied for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterParam {
    pub key: String,
    /// Values split on `,`, trimmed, deduplicated and sorted.
    pub values: Vec<String>,
}

/// Parsed catalog search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Free-text query, trimmed with inner whitespace collapsed. Case is kept:
    /// fuzzy clauses are not analyzed, so `GDP` and `gdp` are different searches.
    pub query: String,
    /// 1-based page number.
    pub page: usize,
    pub size: usize,
    /// Named sort option; `None` keeps relevance order.
    pub sort: Option<String>,
    pub order: SortOrder,
    /// Filters sorted by key.
    pub filters: Vec<FilterParam>,
    /// Entity types for unified search (lower-cased, deduplicated, sorted).
    pub types: Vec<String>,
}

impl SearchRequest {
    /// Parse a request from ordered (key, value) items.
    pub fn from_items(items: &[(String, String)], limits: PageLimits) -> Result<Self> {
        let mut query: Option<String> = None;
        let mut page: Option<usize> = None;
        let mut size: Option<usize> = None;
        let mut sort: Option<Option<String>> = None;
        let mut order: Option<SortOrder> = None;
        let mut types: Vec<String> = Vec::new();
        let mut filters: Vec<FilterParam> = Vec::new();

        for (key, value) in items {
            if !RESERVED_PARAMS.contains(&key.as_str()) {
                merge_filter(&mut filters, key, value);
                continue;
            }
            match key.as_str() {
                "query" => {
                    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
                    set_once(&mut query, "query", collapsed)?;
                }
                "page" => {
                    let parsed: usize = value
                        .trim()
                        .parse()
                        .map_err(|_| Error::invalid("page", value))?;
                    if parsed == 0 {
                        return Err(Error::invalid("page", value));
                    }
                    set_once(&mut page, "page", parsed)?;
                }
                "size" => {
                    let parsed: usize = value
                        .trim()
                        .parse()
                        .map_err(|_| Error::invalid("size", value))?;
                    if parsed == 0 || parsed > limits.max_size {
                        return Err(Error::OutOfRange {
                            param: "size".to_string(),
                            value: parsed,
                            min: 1,
                            max: limits.max_size,
                        });
                    }
                    set_once(&mut size, "size", parsed)?;
                }
                "sort" => {
                    let trimmed = value.trim();
                    let parsed = (!trimmed.is_empty()).then(|| trimmed.to_ascii_lowercase());
                    set_once(&mut sort, "sort", parsed)?;
                }
                "order" => {
                    let parsed =
                        SortOrder::parse(value).ok_or_else(|| Error::invalid("order", value))?;
                    set_once(&mut order, "order", parsed)?;
                }
                _ => types.extend(split_values(value).iter().map(|t| t.to_ascii_lowercase())),
            }
        }

        filters.retain(|f| !f.values.is_empty());
        for filter in &mut filters {
            filter.values.sort_unstable();
            filter.values.dedup();
        }
        filters.sort_by(|a, b| a.key.cmp(&b.key));
        types.sort_unstable();
        types.dedup();

        let request = Self {
            query: query.unwrap_or_default(),
            page: page.unwrap_or(1),
            size: size.unwrap_or(limits.default_size),
            sort: sort.flatten(),
            order: order.unwrap_or_default(),
            filters,
            types,
        };

        if request.from().saturating_add(request.size) > limits.max_result_window {
            return Err(Error::OutOfRange {
                param: "page".to_string(),
                value: request.page,
                min: 1,
                max: (limits.max_result_window / request.size).max(1),
            });
        }

        Ok(request)
    }

    /// Zero-based offset of the first hit on the requested page.
    pub fn from(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.size)
    }
}

/// Split a comma list, trimming entries and dropping empties.
pub fn split_values(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn set_once<T>(slot: &mut Option<T>, name: &str, value: T) -> Result<()> {
    if slot.is_some() {
        return Err(Error::DuplicateParameter(name.to_string()));
    }
    *slot = Some(value);
    Ok(())
}

fn merge_filter(filters: &mut Vec<FilterParam>, key: &str, value: &str) {
    let values = split_values(value);
    match filters.iter_mut().find(|f| f.key == key) {
        Some(existing) => existing.values.extend(values),
        None => filters.push(FilterParam {
            key: key.to_string(),
            values,
        }),
    }
}
