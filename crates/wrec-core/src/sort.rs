//! Stable ordering of resource records by a user-selected column.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::ParseControlError;
use crate::record::ResourceRecord;

/// Column a result list can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Url,
    #[serde(alias = "ts")]
    Timestamp,
    #[serde(alias = "mime")]
    MimeType,
    Status,
    Digest,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Url,
        SortKey::Timestamp,
        SortKey::MimeType,
        SortKey::Status,
        SortKey::Digest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Url => "url",
            SortKey::Timestamp => "timestamp",
            SortKey::MimeType => "mime",
            SortKey::Status => "status",
            SortKey::Digest => "digest",
        }
    }

    /// Column heading shown next to the key.
    pub fn display_name(self) -> &'static str {
        match self {
            SortKey::Url => "URL",
            SortKey::Timestamp => "Date",
            SortKey::MimeType => "Media Type",
            SortKey::Status => "Status",
            SortKey::Digest => "Digest",
        }
    }

    fn compare(self, a: &ResourceRecord, b: &ResourceRecord) -> Ordering {
        match self {
            SortKey::Url => a.url.cmp(&b.url),
            SortKey::Timestamp => a.timestamp.cmp(&b.timestamp),
            SortKey::MimeType => a.mime_type.cmp(&b.mime_type),
            SortKey::Status => a.status.cmp(&b.status),
            SortKey::Digest => a.digest_str().cmp(b.digest_str()),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = ParseControlError;

    /// Accepts the short name, the display name (`Media Type`), and the
    /// `-`/`_` spellings of either.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let normalized: String = s
            .chars()
            .map(|c| if c == '-' || c == '_' { ' ' } else { c.to_ascii_lowercase() })
            .collect();
        match normalized.as_str() {
            "url" => Ok(SortKey::Url),
            "timestamp" | "ts" | "date" => Ok(SortKey::Timestamp),
            "mime" | "mimetype" | "mime type" | "media type" | "mediatype" => Ok(SortKey::MimeType),
            "status" => Ok(SortKey::Status),
            "digest" => Ok(SortKey::Digest),
            _ => Err(ParseControlError::UnknownSortKey(s.to_string())),
        }
    }
}

/// Sort column plus direction. Defaults to ascending by URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SortSpec {
    pub key: SortKey,
    pub descending: bool,
}

impl SortSpec {
    pub fn new(key: SortKey, descending: bool) -> Self {
        Self { key, descending }
    }

    pub fn ascending(key: SortKey) -> Self {
        Self::new(key, false)
    }

    /// Column-header click: the active column flips direction, any other
    /// column becomes active in ascending order.
    pub fn toggle(&mut self, key: SortKey) {
        if self.key == key {
            self.descending = !self.descending;
        } else {
            self.key = key;
            self.descending = false;
        }
    }

    /// Comparator for this spec. Equal keys stay `Equal` in both directions,
    /// which keeps ties in input order under a stable sort.
    pub fn compare(&self, a: &ResourceRecord, b: &ResourceRecord) -> Ordering {
        let ord = self.key.compare(a, b);
        if self.descending {
            ord.reverse()
        } else {
            ord
        }
    }
}

/// Reorder `indices` (positions into `records`) according to `spec`.
pub fn sort_indices(records: &[ResourceRecord], indices: &mut [usize], spec: &SortSpec) {
    indices.sort_by(|&a, &b| spec.compare(&records[a], &records[b]));
}

/// New ordering of `records` according to `spec`; the input slice is untouched.
pub fn sort<'a>(records: &[&'a ResourceRecord], spec: &SortSpec) -> Vec<&'a ResourceRecord> {
    let mut out = records.to_vec();
    out.sort_by(|a, b| spec.compare(a, b));
    out
}
