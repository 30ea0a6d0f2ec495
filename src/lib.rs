//! Follow an external agent's edits in a host editor.
//!
//! Edits streamed from an agent are located in the live documents, the view
//! is moved onto them (debounced), pending changes are shown as inline diff
//! previews until they are approved or rejected, and applied writes get a
//! short highlight over exactly the part that changed.
//!
//! The host editor is reached only through [`host::EditorHost`];
//! [`host::MemoryHost`] is an in-memory implementation.

pub mod change;
pub mod config;
pub mod error;
pub mod event;
pub mod follow;
pub mod highlight;
pub mod host;
pub mod preview;
pub mod session;
pub mod text;
pub mod viewport;

pub use change::{ChangeId, DiffInfo, Location};
pub use config::{FollowSettings, SettingsLoadOutcome, load_settings};
pub use error::{FollowError, FollowResult};
pub use event::AgentEvent;
pub use host::{EditorHost, MemoryHost};
pub use session::{EventOutcome, PermissionDisposition, Session, SessionRegistry};
