//! Move the secondary view onto an offset without taking focus.
//!
//! # Settle passes
//!
//! A freshly shown view may still be resized or redrawn by the host after
//! the first move, which can scroll the target out of sight again. After
//! every positioning, a background task re-asserts the same point at each
//! configured settle delay (measured from the initial move). Re-asserting
//! is idempotent, so passes may run any number of times, and a newer
//! positioning aborts the settle task of the previous one.
//!
//! The offset is clamped to the current document length on every pass,
//! because the document may have been edited in between.
//!
//! Settle tasks run on the runtime given through
//! [`ViewportPositioner::on_runtime`], else on the current one. With
//! neither, only the initial move happens.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::config::defaults::default_settle_delays;
use crate::error::{FollowResult, LockResultExt};
use crate::host::{DocumentId, EditorHost};

const LOG_TARGET: &str = "agent_follow::viewport";

pub struct ViewportPositioner {
    host: Arc<dyn EditorHost>,
    settle_delays: ArcSwap<Vec<Duration>>,
    settle_task: Mutex<Option<AbortHandle>>,
    runtime: Option<Handle>,
}

impl ViewportPositioner {
    pub fn new(host: Arc<dyn EditorHost>) -> Self {
        Self::with_settle_delays(host, default_settle_delays())
    }

    pub fn with_settle_delays(host: Arc<dyn EditorHost>, settle_delays: Vec<Duration>) -> Self {
        Self {
            host,
            settle_delays: ArcSwap::from_pointee(settle_delays),
            settle_task: Mutex::new(None),
            runtime: None,
        }
    }

    /// Spawn settle tasks on `runtime` instead of the caller's runtime.
    pub fn on_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Replace the settle delays used by later positionings.
    pub fn set_settle_delays(&self, delays: Vec<Duration>) {
        self.settle_delays.store(Arc::new(delays));
    }

    /// Show `doc` without focus and put its view point at `offset`.
    ///
    /// Settle passes are scheduled only when a runtime is available.
    pub fn position(&self, doc: DocumentId, offset: usize) -> FollowResult<()> {
        self.host.show_without_focus(doc)?;
        self.host.set_view_point(doc, offset)?;
        self.schedule_settle(doc, offset);
        Ok(())
    }

    /// Abort the pending settle task, if any.
    pub fn cancel_settle(&self) {
        if let Some(handle) = self
            .settle_task
            .lock()
            .recover_poison("ViewportPositioner::cancel_settle")
            .take()
        {
            handle.abort();
        }
    }

    fn schedule_settle(&self, doc: DocumentId, offset: usize) {
        let mut slot = self
            .settle_task
            .lock()
            .recover_poison("ViewportPositioner::schedule_settle");
        if let Some(previous) = slot.take() {
            previous.abort();
        }

        let delays = self.settle_delays.load_full();
        if delays.is_empty() {
            return;
        }
        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            log::trace!(target: LOG_TARGET, "No runtime; skipping settle passes for {}", doc);
            return;
        };

        let host = Arc::clone(&self.host);
        let task = runtime.spawn(async move {
            let mut elapsed = Duration::ZERO;
            for delay in delays.iter().copied() {
                tokio::time::sleep(delay.saturating_sub(elapsed)).await;
                elapsed = elapsed.max(delay);
                settle_once(host.as_ref(), doc, offset);
            }
        });
        *slot = Some(task.abort_handle());
    }
}

impl Drop for ViewportPositioner {
    fn drop(&mut self) {
        self.cancel_settle();
    }
}

/// Re-assert the view point, clamped to the live text.
fn settle_once(host: &dyn EditorHost, doc: DocumentId, offset: usize) {
    let Some(text) = host.text(doc) else {
        log::trace!(target: LOG_TARGET, "Document {} closed before settling", doc);
        return;
    };
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    if let Err(err) = host.set_view_point(doc, offset) {
        log::debug!(target: LOG_TARGET, "Settle pass for {} failed: {}", doc, err);
    }
}
