//! Debounced "follow the agent" view moves.
//!
//! Agents emit several tool-call updates in quick succession for one
//! logical edit. Moving the view on each of them makes it jump around, so
//! requests are coalesced: each session has at most one pending timer, and
//! scheduling a new request aborts the pending one. Only the most recent
//! request within the debounce window is executed.
//!
//! Timers run on the runtime handle given at construction, so callers do
//! not need to be inside a runtime themselves.
//!
//! ```text
//! schedule(request)
//!       │
//!       ├─► abort pending timer (if any), bump generation
//!       │
//!       └─► spawn timer task
//!               │
//!               ├─► sleep(delay)
//!               ├─► claim the pending slot (only if generation still matches)
//!               └─► resolve target offset and position the viewport
//! ```
//!
//! The target is resolved when the timer fires, against the live document:
//! the line hint when present, else the first full-document match of the
//! old text. Without either, the document is shown and the view point is
//! left alone. A path with no document behind it is a silent no-op.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::change::{DiffInfo, Location};
use crate::error::{FollowResult, LockResultExt};
use crate::host::EditorHost;
use crate::text::{Locator, SearchWindow, line_start};
use crate::viewport::ViewportPositioner;

const LOG_TARGET: &str = "agent_follow::follow";

/// Where to move the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowRequest {
    pub location: Location,
    pub diff: Option<DiffInfo>,
}

impl FollowRequest {
    pub fn new(location: Location, diff: Option<DiffInfo>) -> Self {
        Self { location, diff }
    }
}

struct PendingFollow {
    generation: u64,
    handle: AbortHandle,
}

pub struct FollowScheduler {
    host: Arc<dyn EditorHost>,
    positioner: Arc<ViewportPositioner>,
    window: ArcSwap<SearchWindow>,
    pending: Arc<Mutex<Option<PendingFollow>>>,
    generation: AtomicU64,
    runtime: Handle,
}

impl FollowScheduler {
    pub fn new(
        host: Arc<dyn EditorHost>,
        positioner: Arc<ViewportPositioner>,
        runtime: Handle,
    ) -> Self {
        Self {
            host,
            positioner,
            window: ArcSwap::from_pointee(SearchWindow::default()),
            pending: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
            runtime,
        }
    }

    /// Search window used when the target is found by searching.
    pub fn set_window(&self, window: SearchWindow) {
        self.window.store(Arc::new(window));
    }

    /// Schedule a follow `delay` from now, superseding any pending one.
    pub fn schedule(&self, request: FollowRequest, delay: Duration) {
        let window = **self.window.load();
        let mut pending = self.pending.lock().recover_poison("FollowScheduler::schedule");
        if let Some(previous) = pending.take() {
            previous.handle.abort();
            log::trace!(
                target: LOG_TARGET,
                "Superseded pending follow (generation {})",
                previous.generation
            );
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let host = Arc::clone(&self.host);
        let positioner = Arc::clone(&self.positioner);
        let slot = Arc::clone(&self.pending);

        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;

            {
                let mut pending = slot.lock().recover_poison("FollowScheduler timer");
                if !pending.as_ref().is_some_and(|p| p.generation == generation) {
                    return;
                }
                pending.take();
            }

            log::debug!(
                target: LOG_TARGET,
                "Debounce timer expired, following {}",
                request.location.path
            );
            run_follow(host.as_ref(), &positioner, &request, window);
        });

        *pending = Some(PendingFollow {
            generation,
            handle: task.abort_handle(),
        });
    }

    /// Drop the pending follow without running it.
    pub fn cancel(&self) {
        if let Some(previous) = self
            .pending
            .lock()
            .recover_poison("FollowScheduler::cancel")
            .take()
        {
            previous.handle.abort();
            log::trace!(target: LOG_TARGET, "Cancelled pending follow");
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .recover_poison("FollowScheduler::is_pending")
            .as_ref()
            .is_some_and(|p| !p.handle.is_finished())
    }
}

impl Drop for FollowScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Execute a follow, reporting host failures instead of propagating them;
/// there is no caller left to receive them once a timer has fired.
fn run_follow(
    host: &dyn EditorHost,
    positioner: &ViewportPositioner,
    request: &FollowRequest,
    window: SearchWindow,
) {
    if let Err(err) = execute_follow(host, positioner, request, window) {
        log::warn!(target: LOG_TARGET, "Follow to {} failed: {}", request.location.path, err);
        host.notify(&format!("agent-follow: {}", err));
    }
}

fn execute_follow(
    host: &dyn EditorHost,
    positioner: &ViewportPositioner,
    request: &FollowRequest,
    window: SearchWindow,
) -> FollowResult<()> {
    let Some(path) = host.resolve_path(&request.location.path) else {
        return Ok(());
    };
    let Some(doc) = host.find_document(&path)? else {
        log::debug!(target: LOG_TARGET, "No document at {}; nothing to follow", path.display());
        return Ok(());
    };
    let text = host.read(doc)?;

    let old = request.diff.as_ref().and_then(|d| d.old.as_deref());
    let offset = match (request.location.line, old) {
        (Some(line), _) => Some(line_start(&text, line)),
        (None, Some(old)) => Locator::new(window)
            .locate(&text, old, None)
            .map(|found| found.offset),
        (None, None) => None,
    };

    match offset {
        Some(offset) => positioner.position(doc, offset),
        None => {
            log::debug!(
                target: LOG_TARGET,
                "No target offset in {}; showing without moving",
                path.display()
            );
            host.show_without_focus(doc)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostEffect, MemoryHost};

    const PATH: &str = "/work/notes.md";

    fn scheduler(host: &Arc<MemoryHost>, runtime: Handle) -> FollowScheduler {
        let positioner = Arc::new(ViewportPositioner::with_settle_delays(
            host.clone(),
            Vec::new(),
        ));
        FollowScheduler::new(host.clone(), positioner, runtime)
    }

    fn shows(host: &MemoryHost) -> usize {
        host.effects()
            .iter()
            .filter(|e| matches!(e, HostEffect::Show { .. }))
            .count()
    }

    const DELAY: Duration = Duration::from_millis(300);

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_last_request() {
        let host = Arc::new(MemoryHost::new());
        let doc = host.open_text(PATH, "one\ntwo\nthree\nfour\n");
        let scheduler = scheduler(&host, Handle::current());

        for line in [1, 2, 3] {
            scheduler.schedule(FollowRequest::new(Location::new(PATH, Some(line)), None), DELAY);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(host.effects().is_empty());
        assert!(scheduler.is_pending());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(shows(&host), 1);
        assert_eq!(host.view_points(), vec![(doc, 8)]);
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_debounces_when_called_outside_runtime() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();
        let host = Arc::new(MemoryHost::new());
        let doc = host.open_text(PATH, "a\nb\nc\n");
        let scheduler = scheduler(&host, runtime.handle().clone());

        for line in [1, 2, 3] {
            scheduler.schedule(FollowRequest::new(Location::new(PATH, Some(line)), None), DELAY);
        }
        assert!(host.view_points().is_empty());
        assert!(scheduler.is_pending());

        runtime.block_on(async { tokio::time::sleep(Duration::from_secs(1)).await });
        assert_eq!(host.view_points(), vec![(doc, 4)]);
        assert!(!scheduler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_searches_old_text_without_line_hint() {
        let host = Arc::new(MemoryHost::new());
        let doc = host.open_text(PATH, "alpha\nbeta\ngamma\n");
        let scheduler = scheduler(&host, Handle::current());

        scheduler.schedule(
            FollowRequest::new(
                Location::new(PATH, None),
                Some(DiffInfo::new("gamma", "GAMMA")),
            ),
            DELAY,
        );
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(host.view_points(), vec![(doc, 11)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_target_only_shows_document() {
        let host = Arc::new(MemoryHost::new());
        host.open_text(PATH, "alpha\n");
        let scheduler = scheduler(&host, Handle::current());

        scheduler.schedule(FollowRequest::new(Location::new(PATH, None), None), DELAY);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(shows(&host), 1);
        assert!(host.view_points().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_follow() {
        let host = Arc::new(MemoryHost::new());
        host.open_text(PATH, "alpha\n");
        let scheduler = scheduler(&host, Handle::current());

        scheduler.schedule(FollowRequest::new(Location::new(PATH, Some(1)), None), DELAY);
        scheduler.cancel();
        assert!(!scheduler.is_pending());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(host.effects().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_document_is_silent() {
        let host = Arc::new(MemoryHost::new());
        let scheduler = scheduler(&host, Handle::current());

        scheduler.schedule(
            FollowRequest::new(Location::new("/missing/file.rs", Some(3)), None),
            DELAY,
        );
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(host.effects().is_empty());
        assert!(!scheduler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_failure_is_reported_once() {
        let host = Arc::new(MemoryHost::new());
        host.open_text(PATH, "alpha\n");
        host.set_fail_views(true);
        let scheduler = scheduler(&host, Handle::current());

        scheduler.schedule(FollowRequest::new(Location::new(PATH, Some(1)), None), DELAY);
        tokio::time::sleep(Duration::from_secs(1)).await;

        let effects = host.effects();
        assert_eq!(effects.len(), 1);
        assert!(matches!(
            &effects[0],
            HostEffect::Notify { message } if message.contains("view rejected")
        ));
    }
}
