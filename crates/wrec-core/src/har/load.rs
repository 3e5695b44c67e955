//! Convert a HAR file into a collection snapshot.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::DateTime;
use std::path::Path;

use crate::checksum::payload_digest;
use crate::record::{CollectionSnapshot, ResourceRecord};

use super::parse::{HarContent, HarEntry, HarLog};

/// Reads a HAR file and maps each entry with a request URL to a `ResourceRecord`.
///
/// The title is the first page title, falling back to the file stem. Entries
/// keep file order; entries without a URL are skipped.
pub fn load_har(path: &Path) -> Result<CollectionSnapshot> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read HAR file: {}", path.display()))?;
    let har: HarLog = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse HAR JSON: {}", path.display()))?;

    let title = har
        .log
        .pages
        .iter()
        .map(|p| p.title.trim())
        .find(|t| !t.is_empty())
        .map(String::from)
        .unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

    let total = har.log.entries.len();
    let records: Vec<ResourceRecord> = har
        .log
        .entries
        .into_iter()
        .filter_map(entry_to_record)
        .collect();

    if records.len() < total {
        tracing::warn!(
            path = %path.display(),
            skipped = total - records.len(),
            "skipped HAR entries without a request URL"
        );
    }
    tracing::debug!(path = %path.display(), records = records.len(), "loaded HAR");

    Ok(CollectionSnapshot::new(title, records))
}

fn entry_to_record(entry: HarEntry) -> Option<ResourceRecord> {
    let url = entry.request.url.trim();
    if url.is_empty() {
        return None;
    }
    Some(ResourceRecord {
        url: url.to_string(),
        timestamp: parse_started(&entry.started_date_time),
        mime_type: normalize_mime(&entry.response.content.mime_type),
        status: u16::try_from(entry.response.status).unwrap_or(0),
        digest: body_digest(&entry.response.content),
    })
}

/// `startedDateTime` as epoch milliseconds; unparseable values read as 0.
fn parse_started(value: &str) -> i64 {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(0)
}

/// Drop media-type parameters: `text/html; charset=utf-8` -> `text/html`.
fn normalize_mime(raw: &str) -> String {
    raw.split(';').next().unwrap_or("").trim().to_string()
}

/// Digest of the recorded body, if one was captured.
fn body_digest(content: &HarContent) -> Option<String> {
    let text = content.text.as_deref().filter(|t| !t.is_empty())?;
    let is_base64 = content
        .encoding
        .as_deref()
        .is_some_and(|e| e.eq_ignore_ascii_case("base64"));
    let digest = if is_base64 {
        match STANDARD.decode(text) {
            Ok(bytes) => payload_digest(&bytes),
            Err(_) => payload_digest(text.as_bytes()),
        }
    } else {
        payload_digest(text.as_bytes())
    };
    Some(digest)
}
