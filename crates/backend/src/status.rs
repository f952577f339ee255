//! Snapshot of a queue's state for `quill status`.

use std::path::PathBuf;

use serde::Serialize;

use crate::{
  daemon::running_worker_pid,
  domain::config::ResponseNaming,
  queue::{QueueError, QueueLayout, QueueStore, Slot},
};

#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
  /// A live worker owns this state root
  pub monitoring: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub worker_pid: Option<u32>,
  pub inbox: PathBuf,
  pub outbox: PathBuf,
  pub response_naming: ResponseNaming,
  /// Requests waiting to be claimed
  pub pending: usize,
  /// Requests claimed but not completed
  pub in_flight: Vec<String>,
  /// Responses nobody has collected yet
  pub unread_responses: usize,
  /// Requests handled by the worker reporting this status
  #[serde(skip_serializing_if = "Option::is_none")]
  pub processed_count: Option<usize>,
}

impl QueueStatus {
  pub async fn collect(layout: &QueueLayout, naming: ResponseNaming) -> Result<Self, QueueError> {
    let store = QueueStore::new(layout.clone());

    let pending = store
      .list(Slot::Inbox, "*.txt")
      .await?
      .iter()
      .filter(|f| f.request_id().is_some())
      .count();

    let mut in_flight: Vec<String> = store
      .list(Slot::Claimed, "*.txt")
      .await?
      .into_iter()
      .map(|f| f.name)
      .collect();
    in_flight.sort();

    let unread_responses = store.list(Slot::Outbox, "*.txt").await?.len();
    let worker_pid = running_worker_pid(layout);

    Ok(Self {
      monitoring: worker_pid.is_some(),
      worker_pid,
      inbox: layout.dir(Slot::Inbox).to_path_buf(),
      outbox: layout.dir(Slot::Outbox).to_path_buf(),
      response_naming: naming,
      pending,
      in_flight,
      unread_responses,
      processed_count: None,
    })
  }

  pub fn with_processed_count(mut self, count: usize) -> Self {
    self.processed_count = Some(count);
    self
  }
}
