//! Processor side of the queue
//!
//! A [`Worker`] repeatedly scans the inbox, claims the oldest request it has
//! not seen, runs the payload through a [`Transformer`] and deposits the
//! result in the outbox under the correlated name.
//!
//! ```text
//! Idle -> Scanning -> Claimed -> Processing -> Done -> Idle
//!   \-> Stopped (cancellation)
//! ```
//!
//! [`WorkerHandle`] runs a worker as a tokio task and owns start/stop.

mod handle;
mod processed;
mod runner;
pub mod transform;

pub use handle::WorkerHandle;
pub use processed::ProcessedSet;
pub use runner::{Claim, Worker, WorkerState, WorkerStatus};
#[cfg(feature = "claude")]
pub use transform::PromptTransformer;
pub use transform::{Identity, TransformError, Transformer, Uppercase};

use crate::{domain::request::RequestId, queue::QueueError};

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
  #[error(transparent)]
  Queue(#[from] QueueError),
  #[error("No claimed request with id {0}")]
  UnknownClaim(RequestId),
  #[error("Malformed request: {0}")]
  Malformed(String),
  #[error("Transformation failed: {0}")]
  Transform(#[from] TransformError),
}
