//! Quill: a filesystem-mediated text request/response queue.
//!
//! Callers [`submit`](submit::Submitter::submit) text into an inbox
//! directory; a [`Worker`](worker::Worker) picks requests up, transforms
//! them and deposits responses in an outbox under a name the caller can
//! compute from its request id.

mod domain;
pub use domain::{config, request};

pub mod dirs;
pub mod prompt;
pub mod queue;
pub mod status;
pub mod submit;
pub mod worker;

mod daemon;
pub use daemon::{Daemon, DaemonError, LOG_FILE_NAME, RuntimeConfig, running_worker_pid};

#[cfg(test)]
mod __tests__;
