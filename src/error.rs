//! Error handling types for agent-follow
//!
//! Most conditions in this crate are advisory and never surface as errors:
//! missing inputs are silent no-ops and locate failures are logged soft
//! failures. `FollowError` covers the remaining cases, which are failures of
//! host effects and of loading configuration or events.

use std::sync::PoisonError;
use thiserror::Error;

use crate::host::DocumentId;

/// Error type for operations that reach into the host or the filesystem
#[derive(Debug, Error)]
pub enum FollowError {
    /// The host could not open or find the document for a path
    #[error("Document not found: {path}")]
    DocumentNotFound { path: String },

    /// A document handle no longer refers to an open document
    #[error("Document {0} is no longer open")]
    StaleDocument(DocumentId),

    /// A host primitive (decoration, edit, viewport) failed
    #[error("Host operation failed: {message}")]
    Host { message: String },

    /// Configuration error
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// An inbound event could not be decoded
    #[error("Malformed event: {0}")]
    Event(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for agent-follow operations
pub type FollowResult<T> = Result<T, FollowError>;

/// Helper trait to recover guards from poisoned std mutexes
pub trait LockResultExt<T> {
    /// Recover the guard from a poisoned lock, logging which operation hit it.
    fn recover_poison(self, context: &str) -> T;
}

impl<T> LockResultExt<T> for Result<T, PoisonError<T>> {
    fn recover_poison(self, context: &str) -> T {
        match self {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!(
                    target: "agent_follow::lock_recovery",
                    "Recovered from poisoned lock in {}",
                    context
                );
                poisoned.into_inner()
            }
        }
    }
}

impl FollowError {
    /// Create a document not found error
    pub fn document_not_found(path: impl Into<String>) -> Self {
        FollowError::DocumentNotFound { path: path.into() }
    }

    /// Create a host failure error
    pub fn host(message: impl Into<String>) -> Self {
        FollowError::Host {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        FollowError::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FollowError::document_not_found("/tmp/a.rs").to_string(),
            "Document not found: /tmp/a.rs"
        );
        assert_eq!(
            FollowError::host("decoration rejected").to_string(),
            "Host operation failed: decoration rejected"
        );
        assert_eq!(
            FollowError::StaleDocument(DocumentId(7)).to_string(),
            "Document #7 is no longer open"
        );
    }

    #[test]
    fn test_recover_poison_returns_inner_guard() {
        let lock = Arc::new(Mutex::new(1));
        let poisoner = Arc::clone(&lock);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(lock.is_poisoned());
        let mut guard = lock.lock().recover_poison("test");
        *guard += 1;
        assert_eq!(*guard, 2);
    }
}
