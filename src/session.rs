//! Per-conversation state and event dispatch.
//!
//! A [`Session`] is created when an agent conversation starts and closed
//! when it ends. It owns everything that used to be global: the enabled
//! flag and other settings, one preview store, one follow timer, and the
//! table of tool calls seen so far.
//!
//! # Event handling
//!
//! | event               | effect                                                   |
//! |---------------------|----------------------------------------------------------|
//! | tool-call-update    | track location/diff; schedule a debounced follow         |
//! | permission-request  | show a preview; always continue with normal approval     |
//! | permission-response | remove the preview (accept, reject, cancel alike)        |
//! | file-write          | pulse the changed part of the written text               |
//!
//! A path with no document behind it is not a failure: previews and
//! highlights for it are skipped without telling the user. Failures of host
//! effects stop at [`Session::handle`]: they are logged, reported once
//! through [`EditorHost::notify`], and never prevent the approval flow from
//! continuing.
//!
//! Timers (debounced follows and settle passes) run on the runtime handle
//! the session is created with, whether or not events arrive from inside
//! that runtime.

use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use tokio::runtime::Handle;
use ulid::Ulid;

use crate::change::{ChangeId, DiffInfo, Location};
use crate::config::FollowSettings;
use crate::error::FollowError;
use crate::event::{AgentEvent, PermissionToolCall, ToolCallUpdate};
use crate::follow::{FollowRequest, FollowScheduler};
use crate::highlight::{HighlightDispatcher, HighlightOutcome};
use crate::host::EditorHost;
use crate::preview::{PreviewManager, PreviewOutcome};
use crate::viewport::ViewportPositioner;

const LOG_TARGET: &str = "agent_follow::session";

/// What the caller should do with a permission request after the preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDisposition {
    /// Proceed with the normal approval flow.
    Continue,
}

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Nothing to do for this event.
    Ignored,
    FollowScheduled,
    /// `preview` is `None` when showing the preview failed in the host.
    Permission {
        preview: Option<PreviewOutcome>,
        disposition: PermissionDisposition,
    },
    /// Whether a preview existed for the change.
    PreviewRemoved(bool),
    Highlight(HighlightOutcome),
    /// A host effect failed; the user has been notified.
    Failed(String),
}

impl EventOutcome {
    pub fn disposition(&self) -> Option<PermissionDisposition> {
        match self {
            EventOutcome::Permission { disposition, .. } => Some(*disposition),
            _ => None,
        }
    }
}

/// Last known location and diff of a tool call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedChange {
    pub location: Option<Location>,
    pub diff: Option<DiffInfo>,
}

pub struct Session {
    id: Ulid,
    host: Arc<dyn EditorHost>,
    settings: ArcSwap<FollowSettings>,
    positioner: Arc<ViewportPositioner>,
    previews: PreviewManager,
    follow: FollowScheduler,
    highlight: HighlightDispatcher,
    tracked: DashMap<ChangeId, TrackedChange>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("settings", &"ArcSwap<FollowSettings>")
            .field("previews", &self.previews)
            .field("tracked", &self.tracked.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(host: Arc<dyn EditorHost>, settings: FollowSettings, runtime: Handle) -> Self {
        let positioner = ViewportPositioner::with_settle_delays(
            Arc::clone(&host),
            settings.settle_delays.clone(),
        )
        .on_runtime(runtime.clone());
        let positioner = Arc::new(positioner);
        let follow = FollowScheduler::new(Arc::clone(&host), Arc::clone(&positioner), runtime);
        follow.set_window(settings.window);

        Self {
            id: Ulid::new(),
            previews: PreviewManager::new(Arc::clone(&host), Arc::clone(&positioner)),
            highlight: HighlightDispatcher::new(Arc::clone(&host), Arc::clone(&positioner)),
            follow,
            positioner,
            settings: ArcSwap::from_pointee(settings),
            tracked: DashMap::new(),
            host,
        }
    }

    pub fn id(&self) -> Ulid {
        self.id
    }

    pub fn settings(&self) -> Arc<FollowSettings> {
        self.settings.load_full()
    }

    /// Replace the settings of this session.
    pub fn apply_settings(&self, settings: FollowSettings) {
        self.positioner
            .set_settle_delays(settings.settle_delays.clone());
        self.follow.set_window(settings.window);
        if !settings.enabled {
            self.follow.cancel();
        }
        self.settings.store(Arc::new(settings));
    }

    /// Toggle following and previews. Disabling drops a pending follow;
    /// previews already shown are still removed by their responses.
    pub fn set_enabled(&self, enabled: bool) {
        self.settings.rcu(|current| FollowSettings {
            enabled,
            ..FollowSettings::clone(current)
        });
        if !enabled {
            self.follow.cancel();
        }
        log::info!(
            target: LOG_TARGET,
            "Session {} {}",
            self.id,
            if enabled { "enabled" } else { "disabled" }
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.load().enabled
    }

    pub fn preview_count(&self) -> usize {
        self.previews.store().len()
    }

    pub fn previews(&self) -> &PreviewManager {
        &self.previews
    }

    pub fn is_follow_pending(&self) -> bool {
        self.follow.is_pending()
    }

    pub fn tracked(&self, id: &ChangeId) -> Option<TrackedChange> {
        self.tracked.get(id).map(|entry| entry.value().clone())
    }

    /// Process one event. Events must be handled in arrival order.
    pub fn handle(&self, event: AgentEvent) -> EventOutcome {
        log::debug!(target: LOG_TARGET, "Session {} handling {}", self.id, event.name());
        match event {
            AgentEvent::ToolCallUpdate { update } => self.on_tool_call_update(update),
            AgentEvent::PermissionRequest { tool_call } => self.on_permission_request(tool_call),
            AgentEvent::PermissionResponse { tool_call_id } => {
                self.on_permission_response(&tool_call_id)
            }
            AgentEvent::FileWrite {
                path, tool_call_id, ..
            } => self.on_file_write(&path, tool_call_id.as_ref()),
        }
    }

    /// Remove every preview, cancel timers, and forget tracked changes.
    pub fn close(&self) {
        self.follow.cancel();
        self.positioner.cancel_settle();
        self.previews.clear();
        self.tracked.clear();
        log::debug!(target: LOG_TARGET, "Session {} closed", self.id);
    }

    fn on_tool_call_update(&self, update: ToolCallUpdate) -> EventOutcome {
        let location = update.location();
        let diff = update.diff.as_ref().map(DiffInfo::from);

        if update.status.is_terminal() {
            self.tracked.remove(&update.tool_call_id);
        } else {
            let mut entry = self.tracked.entry(update.tool_call_id.clone()).or_default();
            if let Some(location) = &location {
                entry.location = Some(location.clone());
            }
            if let Some(diff) = &diff {
                entry.diff = Some(diff.clone());
            }
        }

        let settings = self.settings.load();
        match location {
            Some(location) if settings.enabled => {
                self.follow.schedule(
                    FollowRequest::new(location, diff),
                    settings.debounce_delay,
                );
                EventOutcome::FollowScheduled
            }
            _ => EventOutcome::Ignored,
        }
    }

    fn on_permission_request(&self, tool_call: PermissionToolCall) -> EventOutcome {
        let id = tool_call.tool_call_id;
        let diff = tool_call.raw_input.diff();
        let Some(path) = tool_call.raw_input.file_path else {
            return permission(Some(PreviewOutcome::Skipped));
        };

        // A line hint from an earlier update is reused when it names the same file.
        let line = self
            .tracked
            .get(&id)
            .and_then(|t| t.location.clone())
            .filter(|l| l.path == path)
            .and_then(|l| l.line);
        let location = Location::new(path, line);
        {
            let mut entry = self.tracked.entry(id.clone()).or_default();
            entry.location = Some(location.clone());
            if diff.pair().is_some() {
                entry.diff = Some(diff.clone());
            }
        }

        let settings = self.settings.load_full();
        if !settings.enabled {
            return permission(Some(PreviewOutcome::Skipped));
        }
        match self.previews.create(id.clone(), &diff, &location, &settings) {
            Ok(outcome) => permission(Some(outcome)),
            Err(err) => {
                self.report(&format!("preview for {}", id), &err);
                permission(None)
            }
        }
    }

    fn on_permission_response(&self, id: &ChangeId) -> EventOutcome {
        match self.previews.remove(id) {
            Ok(existed) => EventOutcome::PreviewRemoved(existed),
            Err(err) => self.report(&format!("removing preview for {}", id), &err),
        }
    }

    fn on_file_write(&self, path: &str, id: Option<&ChangeId>) -> EventOutcome {
        let settings = self.settings.load_full();
        if !settings.enabled || !settings.highlight {
            return EventOutcome::Ignored;
        }
        let Some(diff) = id.and_then(|id| self.tracked(id)).and_then(|t| t.diff) else {
            return EventOutcome::Highlight(HighlightOutcome::Skipped);
        };
        match self.highlight.dispatch(path, &diff, &settings) {
            Ok(outcome) => EventOutcome::Highlight(outcome),
            Err(err) => self.report(&format!("highlighting {}", path), &err),
        }
    }

    fn report(&self, context: &str, err: &FollowError) -> EventOutcome {
        log::warn!(target: LOG_TARGET, "Session {}: {} failed: {}", self.id, context, err);
        let message = format!("agent-follow: {} failed: {}", context, err);
        self.host.notify(&message);
        EventOutcome::Failed(message)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

fn permission(preview: Option<PreviewOutcome>) -> EventOutcome {
    EventOutcome::Permission {
        preview,
        disposition: PermissionDisposition::Continue,
    }
}

/// Live sessions, keyed by session id. Every session runs its timers on
/// the registry's runtime.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: DashMap<Ulid, Arc<Session>>,
    runtime: Handle,
}

impl SessionRegistry {
    pub fn new(runtime: Handle) -> Self {
        Self {
            sessions: DashMap::new(),
            runtime,
        }
    }

    pub fn start(&self, host: Arc<dyn EditorHost>, settings: FollowSettings) -> Arc<Session> {
        let session = Arc::new(Session::new(host, settings, self.runtime.clone()));
        log::debug!(target: LOG_TARGET, "Started session {}", session.id());
        self.sessions.insert(session.id(), Arc::clone(&session));
        session
    }

    pub fn get(&self, id: Ulid) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|s| Arc::clone(s.value()))
    }

    /// Close and forget a session. Returns whether it existed.
    pub fn end(&self, id: Ulid) -> bool {
        match self.sessions.remove(&id) {
            Some((_, session)) => {
                session.close();
                true
            }
            None => false,
        }
    }

    pub fn end_all(&self) {
        let ids: Vec<Ulid> = self.sessions.iter().map(|s| *s.key()).collect();
        for id in ids {
            self.end(id);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostEffect, MemoryHost};

    const PATH: &str = "/work/src/main.rs";

    fn session(host: &Arc<MemoryHost>) -> Session {
        Session::new(host.clone(), FollowSettings::default(), Handle::current())
    }

    fn request(id: &str, old: &str, new: &str) -> AgentEvent {
        AgentEvent::from_json(
            &serde_json::json!({
                "event": "permission-request",
                "toolCall": {
                    "toolCallId": id,
                    "rawInput": {"file_path": PATH, "old_string": old, "new_string": new}
                }
            })
            .to_string(),
        )
        .unwrap()
    }

    fn response(id: &str) -> AgentEvent {
        AgentEvent::PermissionResponse {
            tool_call_id: id.into(),
        }
    }

    #[tokio::test]
    async fn test_permission_round_trip_cleans_up() {
        let host = Arc::new(MemoryHost::new());
        let doc = host.open_text(PATH, "foo\nbar\n");
        let session = session(&host);

        let outcome = session.handle(request("t1", "foo\nbar", "foo\nbaz"));
        assert_eq!(
            outcome,
            EventOutcome::Permission {
                preview: Some(PreviewOutcome::Created),
                disposition: PermissionDisposition::Continue,
            }
        );
        assert_eq!(host.decorations(doc)[0].range, 4..8);

        assert_eq!(
            session.handle(response("t1")),
            EventOutcome::PreviewRemoved(true)
        );
        assert_eq!(
            session.handle(response("t1")),
            EventOutcome::PreviewRemoved(false)
        );
        assert_eq!(host.decoration_count(), 0);
    }

    #[tokio::test]
    async fn test_disabled_session_skips_preview_but_still_removes() {
        let host = Arc::new(MemoryHost::new());
        host.open_text(PATH, "foo\nbar\n");
        let session = session(&host);

        session.handle(request("t1", "foo\nbar", "foo\nbaz"));
        session.set_enabled(false);
        assert!(!session.is_enabled());

        let outcome = session.handle(request("t2", "foo", "FOO"));
        assert_eq!(outcome.disposition(), Some(PermissionDisposition::Continue));
        assert_eq!(session.preview_count(), 1);

        assert_eq!(
            session.handle(response("t1")),
            EventOutcome::PreviewRemoved(true)
        );
        assert_eq!(session.preview_count(), 0);
    }

    #[tokio::test]
    async fn test_host_failure_is_reported_and_approval_continues() {
        let host = Arc::new(MemoryHost::new());
        host.open_text(PATH, "foo\nbar\n");
        host.set_fail_decorations(true);
        let session = session(&host);

        let outcome = session.handle(request("t1", "foo\nbar", "foo\nbaz"));
        assert_eq!(outcome.disposition(), Some(PermissionDisposition::Continue));
        assert_eq!(
            outcome,
            EventOutcome::Permission {
                preview: None,
                disposition: PermissionDisposition::Continue,
            }
        );
        let notifications: Vec<_> = host
            .effects()
            .into_iter()
            .filter(|e| matches!(e, HostEffect::Notify { .. }))
            .collect();
        assert_eq!(notifications.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_skipped_without_notifying() {
        let host = Arc::new(MemoryHost::new());
        let session = session(&host);

        let outcome = session.handle(request("t1", "a", "b"));
        assert_eq!(
            outcome,
            EventOutcome::Permission {
                preview: Some(PreviewOutcome::Skipped),
                disposition: PermissionDisposition::Continue,
            }
        );
        assert!(host.effects().is_empty());
    }

    #[tokio::test]
    async fn test_permission_request_reuses_tracked_line_hint() {
        let host = Arc::new(MemoryHost::new());
        host.open_text(PATH, "x\n");
        let session = session(&host);
        session.set_enabled(false);

        session.handle(AgentEvent::ToolCallUpdate {
            update: serde_json::from_value(serde_json::json!({
                "toolCallId": "t1",
                "status": "pending",
                "locations": [{"path": PATH, "line": 7}]
            }))
            .unwrap(),
        });
        session.handle(request("t1", "x", "y"));

        let tracked = session.tracked(&"t1".into()).unwrap();
        assert_eq!(tracked.location, Some(Location::new(PATH, Some(7))));
        assert_eq!(tracked.diff, Some(DiffInfo::new("x", "y")));
    }

    #[tokio::test]
    async fn test_terminal_update_forgets_change() {
        let host = Arc::new(MemoryHost::new());
        let session = session(&host);
        session.set_enabled(false);

        let update = |status: &str| AgentEvent::ToolCallUpdate {
            update: serde_json::from_value(serde_json::json!({
                "toolCallId": "t1",
                "status": status,
                "locations": [{"path": PATH}]
            }))
            .unwrap(),
        };
        assert_eq!(session.handle(update("in_progress")), EventOutcome::Ignored);
        assert!(session.tracked(&"t1".into()).is_some());
        session.handle(update("completed"));
        assert!(session.tracked(&"t1".into()).is_none());
    }

    #[tokio::test]
    async fn test_file_write_highlights_tracked_change() {
        let host = Arc::new(MemoryHost::new());
        host.open_text(PATH, "fn main() {}\n");
        let session = session(&host);

        session.handle(request("t1", "fn main() {}", "fn main() { run(); }"));
        session.handle(response("t1"));
        host.open_text(PATH, "fn main() { run(); }\n");

        let outcome = session.handle(AgentEvent::FileWrite {
            path: PATH.to_string(),
            content: None,
            tool_call_id: Some("t1".into()),
        });
        assert_eq!(outcome, EventOutcome::Highlight(HighlightOutcome::Highlighted(11..19)));
    }

    #[tokio::test]
    async fn test_close_removes_everything() {
        let host = Arc::new(MemoryHost::new());
        host.open_text(PATH, "one\ntwo\n");
        let session = session(&host);

        session.handle(request("a", "one", "ONE"));
        session.handle(request("b", "two", "TWO"));
        assert_eq!(session.preview_count(), 2);
        session.close();
        assert_eq!(session.preview_count(), 0);
        assert_eq!(host.decoration_count(), 0);
        assert!(session.tracked(&"a".into()).is_none());
    }

    #[tokio::test]
    async fn test_registry_lifecycle() {
        let host = Arc::new(MemoryHost::new());
        host.open_text(PATH, "one\n");
        let registry = SessionRegistry::new(Handle::current());

        let first = registry.start(host.clone(), FollowSettings::default());
        let second = registry.start(host.clone(), FollowSettings::default());
        assert_ne!(first.id(), second.id());
        assert_eq!(registry.len(), 2);

        first.handle(request("a", "one", "ONE"));
        assert!(registry.end(first.id()));
        assert!(!registry.end(first.id()));
        assert_eq!(host.decoration_count(), 0);
        assert!(registry.get(second.id()).is_some());

        registry.end_all();
        assert!(registry.is_empty());
    }
}
