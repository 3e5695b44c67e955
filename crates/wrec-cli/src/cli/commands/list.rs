//! `wrec list <path>` – filtered, sorted resource table.

use anyhow::Result;
use std::fmt::Write;
use std::path::Path;
use wrec_core::filter::FilterCriteria;
use wrec_core::sort::{SortKey, SortSpec};
use wrec_core::store;
use wrec_core::view::ResultsView;

pub fn run_list(path: &Path, criteria: FilterCriteria, spec: SortSpec) -> Result<()> {
    let store = store::open(path);
    let snapshot = store.snapshot()?;
    let view = ResultsView::new(snapshot, criteria, spec);
    tracing::debug!(
        path = %path.display(),
        matches = view.result_count(),
        "listing resources"
    );
    print!("{}", render(&view));
    Ok(())
}

fn heading(key: SortKey, spec: SortSpec) -> String {
    if key != spec.key {
        return key.display_name().to_uppercase();
    }
    let dir = if spec.descending { "desc" } else { "asc" };
    format!("{} ({dir})", key.display_name().to_uppercase())
}

pub(crate) fn render(view: &ResultsView) -> String {
    let spec = view.sort_spec();
    let mut out = String::new();
    let _ = writeln!(out, "URLs in {}", view.title());
    let _ = writeln!(out, "{} Result(s)", view.result_count());
    if view.is_empty() {
        let _ = writeln!(out, "No Results Found.");
        return out;
    }
    let _ = writeln!(
        out,
        "{:<60} {:<20} {:<24} {:<12} {}",
        heading(SortKey::Url, spec),
        heading(SortKey::Timestamp, spec),
        heading(SortKey::MimeType, spec),
        heading(SortKey::Status, spec),
        heading(SortKey::Digest, spec),
    );
    for r in view.results() {
        let date = r
            .captured_at()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<60} {:<20} {:<24} {:<12} {}",
            r.url,
            date,
            r.mime_type,
            r.status,
            r.digest_str()
        );
    }
    out
}
