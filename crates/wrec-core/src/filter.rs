//! Resource filtering: exact media-type selection plus a URL text query.
//!
//! Filtering is a pure function over borrowed records. The output is always a
//! subsequence of the input (same records, same relative order), so callers can
//! rely on identity when mapping results back to the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseControlError;
use crate::record::ResourceRecord;

/// How the text query is matched against a record URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Contains,
    Prefix,
    Exact,
}

impl MatchMode {
    pub const ALL: [MatchMode; 3] = [MatchMode::Contains, MatchMode::Prefix, MatchMode::Exact];

    pub fn as_str(self) -> &'static str {
        match self {
            MatchMode::Contains => "contains",
            MatchMode::Prefix => "prefix",
            MatchMode::Exact => "exact",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchMode {
    type Err = ParseControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        MatchMode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseControlError::UnknownMatchMode(s.to_string()))
    }
}

/// Named media-type option for a filter selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MimeFilterPreset {
    pub name: &'static str,
    /// Exact media type to match; empty selects everything.
    pub filter: &'static str,
}

pub const MIME_FILTERS: &[MimeFilterPreset] = &[
    MimeFilterPreset { name: "All URLs", filter: "" },
    MimeFilterPreset { name: "HTML", filter: "text/html" },
    MimeFilterPreset { name: "CSS", filter: "text/css" },
    MimeFilterPreset { name: "JavaScript", filter: "application/javascript" },
    MimeFilterPreset { name: "JSON", filter: "application/json" },
    MimeFilterPreset { name: "Plain Text", filter: "text/plain" },
    MimeFilterPreset { name: "PDF", filter: "application/pdf" },
    MimeFilterPreset { name: "PNG", filter: "image/png" },
    MimeFilterPreset { name: "JPEG", filter: "image/jpeg" },
    MimeFilterPreset { name: "SVG", filter: "image/svg+xml" },
];

/// Resolve a selector value: a preset name (case-insensitive) maps to its media
/// type, anything else is taken verbatim as the media type to match.
pub fn resolve_mime_filter(input: &str) -> String {
    let input = input.trim();
    MIME_FILTERS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(input))
        .map(|p| p.filter.to_string())
        .unwrap_or_else(|| input.to_string())
}

/// Current filter controls. Empty `mime_filter` and empty `query` select everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub mime_filter: String,
    pub query: String,
    pub match_mode: MatchMode,
}

impl FilterCriteria {
    pub fn new(mime_filter: impl Into<String>, query: impl Into<String>, match_mode: MatchMode) -> Self {
        Self {
            mime_filter: mime_filter.into(),
            query: query.into(),
            match_mode,
        }
    }

    pub fn mime(mime_filter: impl Into<String>) -> Self {
        Self {
            mime_filter: mime_filter.into(),
            ..Self::default()
        }
    }

    pub fn query(query: impl Into<String>, match_mode: MatchMode) -> Self {
        Self {
            query: query.into(),
            match_mode,
            ..Self::default()
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.mime_filter.is_empty() && self.query.is_empty()
    }

    /// True if `record` passes both the media-type and the text stage.
    pub fn matches(&self, record: &ResourceRecord) -> bool {
        if !self.mime_filter.is_empty() && record.mime_type != self.mime_filter {
            return false;
        }
        self.query.is_empty() || url_matches(&record.url, &self.query, self.match_mode)
    }
}

fn url_matches(url: &str, query: &str, mode: MatchMode) -> bool {
    match mode {
        MatchMode::Contains => url.contains(query),
        MatchMode::Prefix => {
            url.starts_with(query)
                || (!query.contains("://")
                    && strip_http_scheme(url).is_some_and(|rest| rest.starts_with(query)))
        }
        MatchMode::Exact => url == query,
    }
}

fn strip_http_scheme(url: &str) -> Option<&str> {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
}

/// Indices of the records that match `criteria`, in input order.
pub fn filter_indices(records: &[ResourceRecord], criteria: &FilterCriteria) -> Vec<usize> {
    if criteria.is_unfiltered() {
        return (0..records.len()).collect();
    }
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| criteria.matches(r))
        .map(|(i, _)| i)
        .collect()
}

/// Records that match `criteria`, borrowed from `records` in input order.
pub fn filter<'a>(records: &'a [ResourceRecord], criteria: &FilterCriteria) -> Vec<&'a ResourceRecord> {
    filter_indices(records, criteria)
        .into_iter()
        .map(|i| &records[i])
        .collect()
}
