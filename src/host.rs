//! The seam between the follow/preview engine and the host editor.
//!
//! The engine never owns documents or views. Everything it reads or changes
//! goes through [`EditorHost`]: document lookup and text snapshots,
//! decorations, transient highlights, and viewport moves.
//!
//! # Offsets
//!
//! All offsets are byte offsets into the document's UTF-8 text and always lie
//! on character boundaries. Documents are shared with the user and the agent,
//! so callers re-read the text instead of trusting offsets across yields.

pub mod memory;

use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::error::{FollowError, FollowResult};

pub use memory::{HostEffect, MemoryHost};

/// Opaque handle to an open document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DocumentId(pub u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque handle to a decoration created by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DecorationHandle(pub u64);

/// How a decoration's display text relates to the text it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    /// The display text is shown in place of the covered range.
    Replace,
    /// The display text is shown before the anchor; the range is empty.
    Before,
}

/// A run of display text with a single style selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyledSegment {
    pub text: String,
    pub face: String,
}

impl StyledSegment {
    pub fn new(text: impl Into<String>, face: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            face: face.into(),
        }
    }
}

/// Request for a decoration over a document range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecorationSpec {
    pub range: Range<usize>,
    pub placement: Placement,
    pub display: Vec<StyledSegment>,
    pub priority: i32,
}

impl DecorationSpec {
    /// The display override as plain text, without styling.
    pub fn display_text(&self) -> String {
        self.display.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Request for a transient fading highlight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PulseSpec {
    pub range: Range<usize>,
    pub duration: Duration,
    pub face: String,
}

/// Primitives the host editor provides.
///
/// Implementations are expected to be fast, in-memory operations; none of
/// them may block on I/O for long.
pub trait EditorHost: Send + Sync {
    /// Canonicalise a path as reported by the agent. `None` when the path
    /// cannot be resolved.
    fn resolve_path(&self, raw: &str) -> Option<PathBuf>;

    /// Return the open document for `path`, opening it if needed.
    fn open_or_get(&self, path: &Path) -> FollowResult<DocumentId>;

    /// Snapshot of the document's text, `None` if it is no longer open.
    fn text(&self, doc: DocumentId) -> Option<String>;

    fn insert(&self, doc: DocumentId, offset: usize, text: &str) -> FollowResult<()>;

    fn delete(&self, doc: DocumentId, range: Range<usize>) -> FollowResult<()>;

    fn add_decoration(&self, doc: DocumentId, spec: DecorationSpec)
    -> FollowResult<DecorationHandle>;

    /// Remove a decoration. Unknown handles are ignored.
    fn remove_decoration(&self, handle: DecorationHandle);

    fn pulse(&self, doc: DocumentId, spec: PulseSpec) -> FollowResult<()>;

    /// Show the document in a secondary view without moving input focus.
    fn show_without_focus(&self, doc: DocumentId) -> FollowResult<()>;

    /// Scroll the secondary view showing `doc` and put its cursor at `offset`.
    fn set_view_point(&self, doc: DocumentId, offset: usize) -> FollowResult<()>;

    /// Report a message to the user.
    fn notify(&self, message: &str);

    /// Like [`EditorHost::open_or_get`], but a path with no document behind
    /// it is `None` instead of an error.
    fn find_document(&self, path: &Path) -> FollowResult<Option<DocumentId>> {
        match self.open_or_get(path) {
            Ok(doc) => Ok(Some(doc)),
            Err(FollowError::DocumentNotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Like [`EditorHost::text`], but a closed document is an error.
    fn read(&self, doc: DocumentId) -> FollowResult<String> {
        self.text(doc).ok_or(FollowError::StaleDocument(doc))
    }
}

/// Decorations owned by one preview.
///
/// Every handle is released through the host when the set is dropped, so a
/// preview torn down on any path (including an error while building it)
/// cannot leave decorations behind.
pub struct DecorationSet {
    host: Arc<dyn EditorHost>,
    handles: Vec<DecorationHandle>,
}

impl DecorationSet {
    pub fn new(host: Arc<dyn EditorHost>) -> Self {
        Self {
            host,
            handles: Vec::new(),
        }
    }

    pub fn push(&mut self, handle: DecorationHandle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Remove every decoration now. Safe to call more than once.
    pub fn release(&mut self) {
        for handle in self.handles.drain(..) {
            self.host.remove_decoration(handle);
        }
    }
}

impl Drop for DecorationSet {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for DecorationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecorationSet")
            .field("host", &"Arc<dyn EditorHost>")
            .field("handles", &self.handles)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replace_spec(range: Range<usize>, text: &str) -> DecorationSpec {
        DecorationSpec {
            range,
            placement: Placement::Replace,
            display: vec![StyledSegment::new(text, "diff.added")],
            priority: 0,
        }
    }

    #[test]
    fn test_decoration_set_releases_on_drop() {
        let host = Arc::new(MemoryHost::new());
        let doc = host.open_text("/tmp/a.txt", "hello world");

        {
            let mut set = DecorationSet::new(host.clone());
            set.push(host.add_decoration(doc, replace_spec(0..5, "HELLO")).unwrap());
            set.push(host.add_decoration(doc, replace_spec(6..11, "WORLD")).unwrap());
            assert_eq!(set.len(), 2);
            assert_eq!(host.decoration_count(), 2);
        }

        assert_eq!(host.decoration_count(), 0);
    }

    #[test]
    fn test_release_is_idempotent() {
        let host = Arc::new(MemoryHost::new());
        let doc = host.open_text("/tmp/a.txt", "hello");
        let mut set = DecorationSet::new(host.clone());
        set.push(host.add_decoration(doc, replace_spec(0..5, "x")).unwrap());

        set.release();
        set.release();
        assert!(set.is_empty());
        assert_eq!(host.decoration_count(), 0);
    }

    #[test]
    fn test_read_reports_stale_document() {
        let host = MemoryHost::new();
        let err = host.read(DocumentId(42)).unwrap_err();
        assert!(matches!(err, FollowError::StaleDocument(DocumentId(42))));
    }

    #[test]
    fn test_find_document_treats_missing_path_as_absent() {
        let host = MemoryHost::new();
        let doc = host.open_text("/tmp/present.txt", "x");

        assert_eq!(host.find_document(Path::new("/tmp/present.txt")).unwrap(), Some(doc));
        assert_eq!(host.find_document(Path::new("/nope/absent.txt")).unwrap(), None);
    }

    #[test]
    fn test_display_text_concatenates_segments() {
        let spec = DecorationSpec {
            range: 0..0,
            placement: Placement::Before,
            display: vec![
                StyledSegment::new("-old\n", "diff.removed"),
                StyledSegment::new("+new\n", "diff.added"),
            ],
            priority: 10,
        };
        assert_eq!(spec.display_text(), "-old\n+new\n");
    }
}
