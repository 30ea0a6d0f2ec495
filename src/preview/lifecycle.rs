//! Create and tear down inline diff previews for pending changes.
//!
//! # Creating
//!
//! ```text
//! create(id, diff, location)
//!       │
//!       ├─► tear down any previous preview for `id`
//!       ├─► diff_lines(old, new)            (skip when identical)
//!       ├─► find the document               (skip when there is none)
//!       ├─► locate `old` near the line hint (soft failure when absent)
//!       ├─► changed range = prefix lines .. + changed old lines
//!       │       ├─► empty `old`: zero-width, additions only
//!       │       └─► zero-width at end of document: insert a synthetic "\n"
//!       ├─► add decoration (reverting the synthetic "\n" on failure)
//!       ├─► store PreviewState
//!       └─► position viewport at the changed range
//! ```
//!
//! # Tearing down
//!
//! Removing releases the decorations (through [`DecorationSet`]) and deletes
//! the synthetic line break if the document still ends with it. Removing an
//! unknown id is a no-op.

use std::sync::Arc;

use crate::change::{ChangeId, DiffInfo, Location};
use crate::config::FollowSettings;
use crate::error::FollowResult;
use crate::host::{DecorationSet, DecorationSpec, DocumentId, EditorHost, Placement};
use crate::text::{Locator, advance_lines, diff_lines};
use crate::viewport::ViewportPositioner;

use super::render::{LineKind, diff_rows, render_display};
use super::store::{PreviewState, PreviewStore};

const LOG_TARGET: &str = "agent_follow::preview";

/// Result of a preview request that did not fail in the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewOutcome {
    Created,
    /// Missing inputs, unresolvable path, or no visible change.
    Skipped,
    /// The old text could not be found in the document.
    NotFound,
}

pub struct PreviewManager {
    host: Arc<dyn EditorHost>,
    positioner: Arc<ViewportPositioner>,
    store: PreviewStore,
}

impl PreviewManager {
    pub fn new(host: Arc<dyn EditorHost>, positioner: Arc<ViewportPositioner>) -> Self {
        Self {
            host,
            positioner,
            store: PreviewStore::new(),
        }
    }

    pub fn store(&self) -> &PreviewStore {
        &self.store
    }

    /// Show a preview of `diff` in the document named by `location`.
    pub fn create(
        &self,
        id: ChangeId,
        diff: &DiffInfo,
        location: &Location,
        settings: &FollowSettings,
    ) -> FollowResult<PreviewOutcome> {
        let Some((old, new)) = diff.pair() else {
            log::trace!(target: LOG_TARGET, "No old/new text for {}; skipping preview", id);
            return Ok(PreviewOutcome::Skipped);
        };
        let Some(path) = self.host.resolve_path(&location.path) else {
            log::trace!(target: LOG_TARGET, "Unresolvable path {:?} for {}", location.path, id);
            return Ok(PreviewOutcome::Skipped);
        };

        if let Some(previous) = self.store.remove(&id) {
            log::debug!(target: LOG_TARGET, "Replacing existing preview for {}", id);
            self.teardown(previous)?;
        }

        let region = diff_lines(old, new);
        if region.is_unchanged() {
            return Ok(PreviewOutcome::Skipped);
        }

        let Some(doc) = self.host.find_document(&path)? else {
            log::debug!(target: LOG_TARGET, "No document at {} for {}", path.display(), id);
            return Ok(PreviewOutcome::Skipped);
        };
        let text = self.host.read(doc)?;
        let Some(found) = Locator::new(settings.window).locate(&text, old, location.line) else {
            log::debug!(
                target: LOG_TARGET,
                "Old text for {} not found in {}",
                id,
                path.display()
            );
            return Ok(PreviewOutcome::NotFound);
        };
        log::trace!(
            target: LOG_TARGET,
            "Located {} at {} via {:?}",
            id,
            found.offset,
            found.strategy
        );

        let old_range = found.offset..found.offset + old.len();
        let changed_start = advance_lines(&text, old_range.start, region.prefix_lines);
        let changed_end = if old.is_empty() {
            changed_start
        } else {
            advance_lines(&text, changed_start, region.changed_old_line_count)
        };
        let leading_newline = changed_start > 0 && text.as_bytes()[changed_start - 1] != b'\n';

        let (range, placement, trailing_newline, synthetic_newline) = if changed_start
            != changed_end
        {
            let covered = &text[changed_start..changed_end];
            (
                changed_start..changed_end,
                Placement::Replace,
                covered.ends_with('\n'),
                None,
            )
        } else if changed_start == text.len() {
            self.host.insert(doc, changed_start, "\n")?;
            (
                changed_start..changed_start + 1,
                Placement::Replace,
                true,
                Some(changed_start),
            )
        } else {
            (changed_start..changed_start, Placement::Before, true, None)
        };

        let mut rows = diff_rows(&region);
        if old.is_empty() {
            rows.retain(|row| row.kind != LineKind::Removed);
        }
        let display = render_display(
            &rows,
            &settings.faces,
            leading_newline,
            trailing_newline,
        );
        let spec = DecorationSpec {
            range: range.clone(),
            placement,
            display,
            priority: settings.preview_priority,
        };

        let mut decorations = DecorationSet::new(Arc::clone(&self.host));
        match self.host.add_decoration(doc, spec) {
            Ok(handle) => decorations.push(handle),
            Err(err) => {
                if let Some(offset) = synthetic_newline {
                    self.revert_synthetic_newline(doc, offset)?;
                }
                return Err(err);
            }
        }

        self.store.insert(
            id.clone(),
            PreviewState {
                document: doc,
                path,
                decorations,
                old_range,
                changed_range: range,
                replacement: region.changed_new.to_string(),
                synthetic_newline,
            },
        );
        log::debug!(target: LOG_TARGET, "Created preview for {}", id);

        self.positioner.position(doc, changed_start)?;
        Ok(PreviewOutcome::Created)
    }

    /// Remove the preview for `id`. Returns whether one existed.
    pub fn remove(&self, id: &ChangeId) -> FollowResult<bool> {
        match self.store.remove(id) {
            Some(state) => {
                log::debug!(target: LOG_TARGET, "Removing preview for {}", id);
                self.teardown(state)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove every preview. Failures are logged and do not stop the sweep.
    pub fn clear(&self) {
        for (id, state) in self.store.drain() {
            if let Err(err) = self.teardown(state) {
                log::warn!(target: LOG_TARGET, "Failed to tear down preview {}: {}", id, err);
            }
        }
    }

    fn teardown(&self, mut state: PreviewState) -> FollowResult<()> {
        state.decorations.release();
        match state.synthetic_newline {
            Some(offset) => self.revert_synthetic_newline(state.document, offset),
            None => Ok(()),
        }
    }

    /// Delete the synthetic line break if the document still ends with it.
    fn revert_synthetic_newline(&self, doc: DocumentId, offset: usize) -> FollowResult<()> {
        let Some(text) = self.host.text(doc) else {
            return Ok(());
        };
        if text.len() == offset + 1 && text.ends_with('\n') {
            self.host.delete(doc, offset..offset + 1)
        } else {
            log::trace!(
                target: LOG_TARGET,
                "Synthetic newline in {} no longer at end of document",
                doc
            );
            Ok(())
        }
    }
}

impl std::fmt::Debug for PreviewManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewManager")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
