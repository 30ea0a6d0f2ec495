//! In-memory reference host.
//!
//! `MemoryHost` keeps documents as plain strings, loads files from disk the
//! first time they are opened, and records every view, highlight, and
//! message effect so they can be inspected or replayed. Decorations are
//! stored as requested and are not shifted by later edits.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use path_clean::PathClean;
use serde::Serialize;

use super::{DecorationHandle, DecorationSpec, DocumentId, EditorHost, PulseSpec};
use crate::error::{FollowError, FollowResult, LockResultExt};

const LOG_TARGET: &str = "agent_follow::host";

/// An observable effect requested through the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "kebab-case")]
pub enum HostEffect {
    Show { document: DocumentId, path: PathBuf },
    ViewPoint { document: DocumentId, offset: usize },
    Pulse { document: DocumentId, spec: PulseSpec },
    Notify { message: String },
}

struct MemoryDocument {
    path: PathBuf,
    text: String,
}

#[derive(Default)]
pub struct MemoryHost {
    root: Option<PathBuf>,
    documents: DashMap<DocumentId, MemoryDocument>,
    paths: DashMap<PathBuf, DocumentId>,
    decorations: DashMap<DecorationHandle, (DocumentId, DecorationSpec)>,
    effects: Mutex<Vec<HostEffect>>,
    next_id: AtomicU64,
    fail_decorations: AtomicBool,
    fail_views: AtomicBool,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host that resolves relative paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into().clean()),
            ..Self::default()
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn register(&self, path: PathBuf, text: String) -> DocumentId {
        let id = DocumentId(self.next_id());
        self.paths.insert(path.clone(), id);
        self.documents.insert(id, MemoryDocument { path, text });
        id
    }

    /// Open (or replace) a document with the given contents, bypassing disk.
    pub fn open_text(&self, path: impl AsRef<Path>, text: impl Into<String>) -> DocumentId {
        let path = path.as_ref().clean();
        if let Some(id) = self.paths.get(&path).map(|id| *id)
            && let Some(mut doc) = self.documents.get_mut(&id)
        {
            doc.text = text.into();
            return id;
        }
        self.register(path, text.into())
    }

    /// Current text of the document open at `path`.
    pub fn document_text(&self, path: impl AsRef<Path>) -> Option<String> {
        let id = *self.paths.get(&path.as_ref().clean())?;
        self.text(id)
    }

    /// Decorations currently attached to `doc`, ordered by range start.
    pub fn decorations(&self, doc: DocumentId) -> Vec<DecorationSpec> {
        let mut specs: Vec<DecorationSpec> = self
            .decorations
            .iter()
            .filter(|entry| entry.value().0 == doc)
            .map(|entry| entry.value().1.clone())
            .collect();
        specs.sort_by_key(|spec| spec.range.start);
        specs
    }

    pub fn decoration_count(&self) -> usize {
        self.decorations.len()
    }

    pub fn effects(&self) -> Vec<HostEffect> {
        self.effects.lock().recover_poison("MemoryHost::effects").clone()
    }

    pub fn take_effects(&self) -> Vec<HostEffect> {
        std::mem::take(&mut *self.effects.lock().recover_poison("MemoryHost::take_effects"))
    }

    /// Every viewport point set so far, in order.
    pub fn view_points(&self) -> Vec<(DocumentId, usize)> {
        self.effects()
            .into_iter()
            .filter_map(|effect| match effect {
                HostEffect::ViewPoint { document, offset } => Some((document, offset)),
                _ => None,
            })
            .collect()
    }

    /// Make every following `add_decoration` call fail.
    pub fn set_fail_decorations(&self, fail: bool) {
        self.fail_decorations.store(fail, Ordering::Relaxed);
    }

    /// Make every following `show_without_focus` call fail.
    pub fn set_fail_views(&self, fail: bool) {
        self.fail_views.store(fail, Ordering::Relaxed);
    }

    fn record(&self, effect: HostEffect) {
        self.effects
            .lock()
            .recover_poison("MemoryHost::record")
            .push(effect);
    }

    fn check_range(&self, doc: DocumentId, range: &Range<usize>) -> FollowResult<()> {
        let document = self
            .documents
            .get(&doc)
            .ok_or(FollowError::StaleDocument(doc))?;
        let text = &document.text;
        if range.start > range.end
            || range.end > text.len()
            || !text.is_char_boundary(range.start)
            || !text.is_char_boundary(range.end)
        {
            return Err(FollowError::host(format!(
                "range {}..{} is invalid for document {} of length {}",
                range.start,
                range.end,
                doc,
                text.len()
            )));
        }
        Ok(())
    }
}

impl EditorHost for MemoryHost {
    fn resolve_path(&self, raw: &str) -> Option<PathBuf> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let path = PathBuf::from(raw);
        let path = match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        };
        Some(path.clean())
    }

    fn open_or_get(&self, path: &Path) -> FollowResult<DocumentId> {
        let path = path.clean();
        if let Some(id) = self.paths.get(&path) {
            return Ok(*id);
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                log::debug!(target: LOG_TARGET, "Opened {} from disk", path.display());
                Ok(self.register(path, text))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(FollowError::document_not_found(path.display().to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn text(&self, doc: DocumentId) -> Option<String> {
        self.documents.get(&doc).map(|d| d.text.clone())
    }

    fn insert(&self, doc: DocumentId, offset: usize, text: &str) -> FollowResult<()> {
        self.check_range(doc, &(offset..offset))?;
        if let Some(mut document) = self.documents.get_mut(&doc) {
            document.text.insert_str(offset, text);
        }
        Ok(())
    }

    fn delete(&self, doc: DocumentId, range: Range<usize>) -> FollowResult<()> {
        self.check_range(doc, &range)?;
        if let Some(mut document) = self.documents.get_mut(&doc) {
            document.text.replace_range(range, "");
        }
        Ok(())
    }

    fn add_decoration(
        &self,
        doc: DocumentId,
        spec: DecorationSpec,
    ) -> FollowResult<DecorationHandle> {
        if self.fail_decorations.load(Ordering::Relaxed) {
            return Err(FollowError::host("decoration rejected"));
        }
        self.check_range(doc, &spec.range)?;
        let handle = DecorationHandle(self.next_id());
        self.decorations.insert(handle, (doc, spec));
        Ok(handle)
    }

    fn remove_decoration(&self, handle: DecorationHandle) {
        self.decorations.remove(&handle);
    }

    fn pulse(&self, doc: DocumentId, spec: PulseSpec) -> FollowResult<()> {
        self.check_range(doc, &spec.range)?;
        self.record(HostEffect::Pulse {
            document: doc,
            spec,
        });
        Ok(())
    }

    fn show_without_focus(&self, doc: DocumentId) -> FollowResult<()> {
        if self.fail_views.load(Ordering::Relaxed) {
            return Err(FollowError::host("view rejected"));
        }
        let path = self
            .documents
            .get(&doc)
            .map(|d| d.path.clone())
            .ok_or(FollowError::StaleDocument(doc))?;
        self.record(HostEffect::Show {
            document: doc,
            path,
        });
        Ok(())
    }

    fn set_view_point(&self, doc: DocumentId, offset: usize) -> FollowResult<()> {
        self.check_range(doc, &(offset..offset))?;
        self.record(HostEffect::ViewPoint {
            document: doc,
            offset,
        });
        Ok(())
    }

    fn notify(&self, message: &str) {
        log::info!(target: LOG_TARGET, "{}", message);
        self.record(HostEffect::Notify {
            message: message.to_string(),
        });
    }
}
