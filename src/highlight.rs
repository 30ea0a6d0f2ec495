//! Transient highlight of an applied write.
//!
//! The written text is guaranteed to be in the document, so it is found with
//! a plain full-document search. Only the part that actually changed is
//! pulsed; when the character diff leaves nothing to show (identical texts
//! or a pure deletion) the whole written text is pulsed instead.

use std::ops::Range;
use std::sync::Arc;

use crate::change::DiffInfo;
use crate::config::FollowSettings;
use crate::error::FollowResult;
use crate::host::{EditorHost, PulseSpec};
use crate::text::diff_chars;
use crate::viewport::ViewportPositioner;

const LOG_TARGET: &str = "agent_follow::highlight";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightOutcome {
    /// The pulsed document range.
    Highlighted(Range<usize>),
    Skipped,
    NotFound,
}

/// Range to pulse when `new` was written at `start`.
pub fn highlight_range(old: &str, new: &str, start: usize) -> Range<usize> {
    let region = diff_chars(old, new);
    if region.is_unchanged() || region.changed_new.is_empty() {
        return start..start + new.len();
    }
    let changed = region.new_range();
    start + changed.start..start + changed.end
}

pub struct HighlightDispatcher {
    host: Arc<dyn EditorHost>,
    positioner: Arc<ViewportPositioner>,
}

impl HighlightDispatcher {
    pub fn new(host: Arc<dyn EditorHost>, positioner: Arc<ViewportPositioner>) -> Self {
        Self { host, positioner }
    }

    /// Move the view to the changed part of a finished write and pulse it.
    pub fn dispatch(
        &self,
        path: &str,
        diff: &DiffInfo,
        settings: &FollowSettings,
    ) -> FollowResult<HighlightOutcome> {
        let Some((old, new)) = diff.pair() else {
            return Ok(HighlightOutcome::Skipped);
        };
        if new.is_empty() {
            return Ok(HighlightOutcome::Skipped);
        }
        let Some(path) = self.host.resolve_path(path) else {
            return Ok(HighlightOutcome::Skipped);
        };

        let Some(doc) = self.host.find_document(&path)? else {
            log::debug!(target: LOG_TARGET, "No document at {}", path.display());
            return Ok(HighlightOutcome::Skipped);
        };
        let text = self.host.read(doc)?;
        let Some(start) = text.find(new) else {
            log::debug!(
                target: LOG_TARGET,
                "Written text not found in {}",
                path.display()
            );
            return Ok(HighlightOutcome::NotFound);
        };

        let range = highlight_range(old, new, start);
        self.positioner.position(doc, range.start)?;
        self.host.pulse(
            doc,
            PulseSpec {
                range: range.clone(),
                duration: settings.highlight_duration,
                face: settings.faces.pulse.clone(),
            },
        )?;
        log::debug!(
            target: LOG_TARGET,
            "Highlighted {}..{} in {}",
            range.start,
            range.end,
            path.display()
        );
        Ok(HighlightOutcome::Highlighted(range))
    }
}
