//! Inbound agent events.
//!
//! Events arrive as JSON objects tagged by `"event"`:
//!
//! ```json
//! {"event": "tool-call-update", "update": {"toolCallId": "t1", "status": "in_progress",
//!   "kind": "edit", "locations": [{"path": "src/lib.rs", "line": 12}],
//!   "diff": {"old": "a", "new": "b", "file": "src/lib.rs"}}}
//! {"event": "permission-request", "toolCall": {"toolCallId": "t1",
//!   "rawInput": {"file_path": "src/lib.rs", "old_string": "a", "new_string": "b"}}}
//! {"event": "permission-response", "toolCallId": "t1"}
//! {"event": "file-write", "path": "src/lib.rs", "content": "...", "toolCallId": "t1"}
//! ```
//!
//! Unknown fields are ignored, and unknown status or kind values decode as
//! [`ToolCallStatus::Unknown`] / [`ToolKind::Other`].

use serde::{Deserialize, Serialize};

use crate::change::{ChangeId, DiffInfo, Location};
use crate::error::FollowResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ToolCallStatus {
    /// The tool call will not be updated again.
    pub fn is_terminal(self) -> bool {
        matches!(self, ToolCallStatus::Completed | ToolCallStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Read,
    Edit,
    Delete,
    Move,
    Search,
    Execute,
    Think,
    Fetch,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolCallLocation {
    pub path: String,
    #[serde(default)]
    pub line: Option<usize>,
}

impl From<&ToolCallLocation> for Location {
    fn from(location: &ToolCallLocation) -> Self {
        Location::new(location.path.clone(), location.line)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolCallDiff {
    #[serde(default, alias = "oldText")]
    pub old: Option<String>,
    #[serde(default, alias = "newText")]
    pub new: Option<String>,
    #[serde(default, alias = "path")]
    pub file: Option<String>,
}

impl From<&ToolCallDiff> for DiffInfo {
    fn from(diff: &ToolCallDiff) -> Self {
        DiffInfo {
            old: diff.old.clone(),
            new: diff.new.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallUpdate {
    pub tool_call_id: ChangeId,
    #[serde(default)]
    pub status: ToolCallStatus,
    #[serde(default)]
    pub kind: ToolKind,
    #[serde(default)]
    pub locations: Vec<ToolCallLocation>,
    #[serde(default)]
    pub diff: Option<ToolCallDiff>,
}

impl ToolCallUpdate {
    /// Best location for this update: the first reported location, else the
    /// file named by the diff.
    pub fn location(&self) -> Option<Location> {
        self.locations.first().map(Location::from).or_else(|| {
            self.diff
                .as_ref()
                .and_then(|d| d.file.as_ref())
                .map(|file| Location::new(file.clone(), None))
        })
    }
}

/// Tool input of an edit awaiting approval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawEditInput {
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub old_string: Option<String>,
    #[serde(default)]
    pub new_string: Option<String>,
}

impl RawEditInput {
    pub fn diff(&self) -> DiffInfo {
        DiffInfo {
            old: self.old_string.clone(),
            new: self.new_string.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionToolCall {
    pub tool_call_id: ChangeId,
    #[serde(default)]
    pub raw_input: RawEditInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum AgentEvent {
    ToolCallUpdate {
        update: ToolCallUpdate,
    },
    PermissionRequest {
        #[serde(rename = "toolCall")]
        tool_call: PermissionToolCall,
    },
    /// Fires on accept, reject, and cancel alike.
    PermissionResponse {
        #[serde(rename = "toolCallId")]
        tool_call_id: ChangeId,
    },
    FileWrite {
        path: String,
        #[serde(default)]
        content: Option<String>,
        #[serde(rename = "toolCallId", default)]
        tool_call_id: Option<ChangeId>,
    },
}

impl AgentEvent {
    pub fn from_json(json: &str) -> FollowResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            AgentEvent::ToolCallUpdate { .. } => "tool-call-update",
            AgentEvent::PermissionRequest { .. } => "permission-request",
            AgentEvent::PermissionResponse { .. } => "permission-response",
            AgentEvent::FileWrite { .. } => "file-write",
        }
    }
}
