//! Identifiers and hints describing one agent change.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Caller-supplied identifier of one pending change (one per tool call).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(String);

impl ChangeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChangeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ChangeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Where a change happened, as reported by the agent.
///
/// `line` is a 1-based hint and may be stale relative to the live document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
    pub line: Option<usize>,
}

impl Location {
    pub fn new(path: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }
}

/// Old and new text of a change. Either side may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffInfo {
    pub old: Option<String>,
    pub new: Option<String>,
}

impl DiffInfo {
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: Some(old.into()),
            new: Some(new.into()),
        }
    }

    /// Both sides, when both are present.
    pub fn pair(&self) -> Option<(&str, &str)> {
        self.old.as_deref().zip(self.new.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_requires_both_sides() {
        assert_eq!(DiffInfo::new("a", "b").pair(), Some(("a", "b")));
        let only_new = DiffInfo {
            old: None,
            new: Some("b".to_string()),
        };
        assert_eq!(only_new.pair(), None);
        assert_eq!(DiffInfo::default().pair(), None);
    }

    #[test]
    fn test_change_id_is_a_plain_json_string() {
        let id: ChangeId = serde_json::from_str("\"toolu_01\"").unwrap();
        assert_eq!(id, ChangeId::from("toolu_01"));
        assert_eq!(id.to_string(), "toolu_01");
    }
}
