//! Displayed result list: `sort(filter(records, criteria), spec)` kept current
//! as its inputs change.
//!
//! The view holds the current snapshot plus the two control values and caches
//! the derived orderings as indices into the snapshot. Each setter compares the
//! new input with the old one and recomputes only what depends on it: a new
//! sort spec re-sorts the cached filter output, new criteria re-filter and
//! re-sort, and a snapshot with different contents redoes both.

use anyhow::Result;
use std::sync::Arc;

use crate::filter::{self, FilterCriteria};
use crate::record::{CollectionSnapshot, ResourceRecord};
use crate::sort::{self, SortKey, SortSpec};
use crate::store::RecordStore;

#[derive(Debug, Clone)]
pub struct ResultsView {
    snapshot: Arc<CollectionSnapshot>,
    criteria: FilterCriteria,
    spec: SortSpec,
    /// Post-filter positions, in snapshot order.
    filtered: Vec<usize>,
    /// `filtered` reordered by `spec`.
    sorted: Vec<usize>,
    revision: u64,
}

impl ResultsView {
    pub fn new(snapshot: Arc<CollectionSnapshot>, criteria: FilterCriteria, spec: SortSpec) -> Self {
        let mut view = Self {
            snapshot,
            criteria,
            spec,
            filtered: Vec::new(),
            sorted: Vec::new(),
            revision: 0,
        };
        view.refilter();
        view
    }

    /// Replace the snapshot. Returns true if the displayed results were recomputed.
    ///
    /// A snapshot with identical contents is adopted without recomputing, since
    /// the cached positions are equally valid against it.
    pub fn set_snapshot(&mut self, snapshot: Arc<CollectionSnapshot>) -> bool {
        if Arc::ptr_eq(&self.snapshot, &snapshot) {
            return false;
        }
        let unchanged = *self.snapshot == *snapshot;
        self.snapshot = snapshot;
        if unchanged {
            return false;
        }
        self.refilter();
        true
    }

    /// Pull the latest snapshot from `store`.
    pub fn refresh(&mut self, store: &dyn RecordStore) -> Result<bool> {
        let snapshot = store.snapshot()?;
        Ok(self.set_snapshot(snapshot))
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) -> bool {
        if self.criteria == criteria {
            return false;
        }
        self.criteria = criteria;
        self.refilter();
        true
    }

    pub fn set_sort(&mut self, spec: SortSpec) -> bool {
        if self.spec == spec {
            return false;
        }
        self.spec = spec;
        self.resort();
        true
    }

    /// Column-header click on `key`.
    pub fn toggle_sort(&mut self, key: SortKey) {
        let mut spec = self.spec;
        spec.toggle(key);
        self.set_sort(spec);
    }

    fn refilter(&mut self) {
        self.filtered = filter::filter_indices(&self.snapshot.records, &self.criteria);
        self.resort();
    }

    fn resort(&mut self) {
        let mut sorted = self.filtered.clone();
        sort::sort_indices(&self.snapshot.records, &mut sorted, &self.spec);
        self.sorted = sorted;
        self.revision += 1;
        tracing::debug!(
            revision = self.revision,
            matches = self.filtered.len(),
            total = self.snapshot.records.len(),
            key = %self.spec.key,
            descending = self.spec.descending,
            "results recomputed"
        );
    }

    /// Number of post-filter matches; independent of the sort spec.
    pub fn result_count(&self) -> usize {
        self.filtered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }

    /// Displayed records, sorted.
    pub fn results(&self) -> impl Iterator<Item = &ResourceRecord> + '_ {
        self.sorted.iter().map(|&i| &self.snapshot.records[i])
    }

    /// Matching records in snapshot order (before sorting).
    pub fn matches(&self) -> impl Iterator<Item = &ResourceRecord> + '_ {
        self.filtered.iter().map(|&i| &self.snapshot.records[i])
    }

    pub fn title(&self) -> &str {
        &self.snapshot.title
    }

    pub fn snapshot(&self) -> &Arc<CollectionSnapshot> {
        &self.snapshot
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn sort_spec(&self) -> SortSpec {
        self.spec
    }

    /// Incremented every time the displayed sequence is recomputed.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
