//! Inline previews of pending, not yet approved changes.
//!
//! A preview lives from the permission request of a change until its
//! permission response (accepted, rejected, or cancelled alike). Each
//! session owns one [`PreviewManager`] and with it one [`PreviewStore`].

pub mod lifecycle;
pub mod render;
pub mod store;

pub use lifecycle::{PreviewManager, PreviewOutcome};
pub use render::{DiffRow, LineKind, diff_rows, render_display};
pub use store::{PreviewState, PreviewStore};
