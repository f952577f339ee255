//! Filesystem-backed request/response queue
//!
//! The queue is a pair of directories plus a naming convention. Callers
//! deposit requests into the inbox; a worker claims them (moving them into
//! `claimed/`), writes responses into the outbox under a name the caller can
//! compute, and removes the original. There are no locks and no sockets:
//! unique file names are the ownership tokens and deletion is the only
//! "consumed" signal.
//!
//! ```text
//! <state-root>/inbox/<request-id>.txt
//! <state-root>/claimed/<request-id>.txt
//! <state-root>/outbox/<response-name>.txt
//! <state-root>/prompt.txt
//! ```

use std::path::PathBuf;

mod correlator;
mod layout;
mod store;

pub use correlator::Correlator;
pub use layout::{QueueLayout, Slot};
pub use store::{FileRef, QueueStore, write_atomic};

/// Errors raised by queue storage operations
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
  #[error("IO error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("File not found: {0}")]
  NotFound(PathBuf),
  #[error("File already exists: {0}")]
  AlreadyExists(PathBuf),
  #[error("Malformed file {path}: {reason}")]
  Malformed { path: PathBuf, reason: String },
  #[error("Invalid name pattern '{pattern}': {message}")]
  Pattern { pattern: String, message: String },
}

impl QueueError {
  /// Classify an IO error raised while touching `path`
  pub(crate) fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
    let path = path.into();
    match err.kind() {
      std::io::ErrorKind::NotFound => QueueError::NotFound(path),
      std::io::ErrorKind::AlreadyExists => QueueError::AlreadyExists(path),
      std::io::ErrorKind::InvalidData => QueueError::Malformed {
        path,
        reason: "content is not valid UTF-8".to_string(),
      },
      _ => QueueError::Io { path, source: err },
    }
  }

  /// True for the benign list/read race where a file vanished
  pub fn is_not_found(&self) -> bool {
    matches!(self, QueueError::NotFound(_))
  }
}
