use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::Worker;

/// Start/stop control over a worker running as a tokio task
pub struct WorkerHandle {
  cancel: CancellationToken,
  task: Option<JoinHandle<Worker>>,
}

impl WorkerHandle {
  /// Spawn `worker` on the current runtime
  pub fn spawn(worker: Worker) -> Self {
    Self::spawn_with(worker, CancellationToken::new())
  }

  /// Spawn `worker`, stopping when `cancel` (or a parent of it) fires
  pub fn spawn_with(worker: Worker, cancel: CancellationToken) -> Self {
    let task = tokio::spawn(worker.run(cancel.clone()));
    Self {
      cancel,
      task: Some(task),
    }
  }

  pub fn is_running(&self) -> bool {
    self.task.as_ref().is_some_and(|t| !t.is_finished())
  }

  /// Signal the worker to stop and wait for it.
  ///
  /// A request being processed is finished first. Returns the stopped
  /// worker, or `None` if it was already stopped.
  pub async fn stop(&mut self) -> Option<Worker> {
    let Some(task) = self.task.take() else {
      debug!("Worker already stopped");
      return None;
    };

    self.cancel.cancel();
    match task.await {
      Ok(worker) => Some(worker),
      Err(e) => {
        error!(err = %e, "Worker task failed");
        None
      }
    }
  }
}

impl Drop for WorkerHandle {
  fn drop(&mut self) {
    self.cancel.cancel();
  }
}

#[cfg(test)]
mod tests {
  use std::{sync::Arc, time::Duration};

  use super::*;
  use crate::{
    queue::{Correlator, QueueLayout, QueueStore},
    worker::{Identity, WorkerState},
  };
  use tempfile::TempDir;

  async fn worker(temp: &TempDir) -> Worker {
    let layout = QueueLayout::new(temp.path());
    layout.ensure().await.unwrap();
    Worker::new(QueueStore::new(layout), Correlator::default(), Arc::new(Identity))
      .with_intervals(Duration::from_millis(10), Duration::from_millis(10))
  }

  #[tokio::test]
  async fn test_spawn_and_stop() {
    let temp = TempDir::new().unwrap();
    let mut handle = WorkerHandle::spawn(worker(&temp).await);
    assert!(handle.is_running());

    let stopped = handle.stop().await.unwrap();
    assert_eq!(stopped.state(), WorkerState::Stopped);
    assert!(!handle.is_running());
  }

  #[tokio::test]
  async fn test_stop_twice_is_noop() {
    let temp = TempDir::new().unwrap();
    let mut handle = WorkerHandle::spawn(worker(&temp).await);
    assert!(handle.stop().await.is_some());
    assert!(handle.stop().await.is_none());
  }

  #[tokio::test]
  async fn test_parent_token_stops_worker() {
    let temp = TempDir::new().unwrap();
    let parent = CancellationToken::new();
    let mut handle = WorkerHandle::spawn_with(worker(&temp).await, parent.child_token());

    parent.cancel();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_running());
    assert!(handle.stop().await.is_some());
  }
}
