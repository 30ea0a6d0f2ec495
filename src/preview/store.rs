//! Per-session table of live previews, keyed by change id.

use std::ops::Range;
use std::path::PathBuf;

use dashmap::DashMap;

use crate::change::ChangeId;
use crate::host::{DecorationSet, DocumentId};

/// Everything needed to tear one preview down again.
#[derive(Debug)]
pub struct PreviewState {
    pub document: DocumentId,
    pub path: PathBuf,
    /// Released when the state is dropped.
    pub decorations: DecorationSet,
    /// Where the old text matched when the preview was created.
    pub old_range: Range<usize>,
    /// The range the preview decoration covers.
    pub changed_range: Range<usize>,
    /// The changed lines of the new text.
    pub replacement: String,
    /// Offset of a line break inserted to make an end-of-document insertion
    /// addressable; removed again on teardown.
    pub synthetic_newline: Option<usize>,
}

/// Live previews of one session.
///
/// Entries are only ever looked up and removed by their own id.
#[derive(Debug, Default)]
pub struct PreviewStore {
    entries: DashMap<ChangeId, PreviewState>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a preview, returning the entry it replaced.
    pub fn insert(&self, id: ChangeId, state: PreviewState) -> Option<PreviewState> {
        self.entries.insert(id, state)
    }

    pub fn remove(&self, id: &ChangeId) -> Option<PreviewState> {
        self.entries.remove(id).map(|(_, state)| state)
    }

    pub fn contains(&self, id: &ChangeId) -> bool {
        self.entries.contains_key(id)
    }

    /// Run `f` against the entry for `id`, if any.
    pub fn inspect<T>(&self, id: &ChangeId, f: impl FnOnce(&PreviewState) -> T) -> Option<T> {
        self.entries.get(id).map(|entry| f(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return every entry. Used when the session ends.
    pub fn drain(&self) -> Vec<(ChangeId, PreviewState)> {
        let ids: Vec<ChangeId> = self.entries.iter().map(|e| e.key().clone()).collect();
        ids.into_iter()
            .filter_map(|id| self.entries.remove(&id))
            .collect()
    }
}
