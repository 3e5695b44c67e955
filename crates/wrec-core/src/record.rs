//! Captured resource records and the collection snapshot that carries them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One captured network exchange.
///
/// Records are never mutated once a snapshot is handed to a view; filtering and
/// sorting only derive orderings over borrowed records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub url: String,
    /// Capture time in epoch milliseconds.
    #[serde(alias = "ts")]
    pub timestamp: i64,
    /// Media type classification. Empty when unknown.
    #[serde(default, rename = "mimeType", alias = "mime")]
    pub mime_type: String,
    #[serde(default)]
    pub status: u16,
    /// Content-addressed payload hash. Legacy records may not carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ResourceRecord {
    pub fn new(url: impl Into<String>, timestamp: i64) -> Self {
        Self {
            url: url.into(),
            timestamp,
            mime_type: String::new(),
            status: 200,
            digest: None,
        }
    }

    pub fn with_mime(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    /// Digest for display and ordering; absent digests read as empty.
    pub fn digest_str(&self) -> &str {
        self.digest.as_deref().unwrap_or("")
    }

    /// `(url, timestamp)` pair that identifies this capture for replay/download lookups.
    pub fn replay_key(&self) -> (&str, i64) {
        (&self.url, self.timestamp)
    }

    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp)
    }

    /// 14-digit `YYYYMMDDhhmmss` form of the capture time, as used in replay paths.
    pub fn timestamp_14(&self) -> Option<String> {
        self.captured_at()
            .map(|dt| dt.format("%Y%m%d%H%M%S").to_string())
    }
}

/// Immutable snapshot of a collection: display title, optional recording
/// session identifier, and the captured records in store order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default)]
    pub records: Vec<ResourceRecord>,
}

impl CollectionSnapshot {
    pub fn new(title: impl Into<String>, records: Vec<ResourceRecord>) -> Self {
        Self {
            title: title.into(),
            session: None,
            records,
        }
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }
}
