use std::{
  sync::Arc,
  time::{Duration, Instant},
};

use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::{ProcessedSet, Transformer, WorkerError};
use crate::{
  domain::{config::Config, request::RequestId},
  queue::{Correlator, FileRef, QueueError, QueueLayout, QueueStore, Slot},
};

/// Pattern every request file matches
const REQUEST_PATTERN: &str = "*.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
  Idle,
  Scanning,
  Claimed,
  Processing,
  Done,
  Stopped,
}

/// A request this worker owns until it is completed
#[derive(Debug, Clone)]
pub struct Claim {
  pub id: RequestId,
  pub payload: String,
  file: FileRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
  pub state: WorkerState,
  pub processed: usize,
  pub transformer: String,
}

/// Processor side of the queue.
///
/// Owns its [`ProcessedSet`]; drive it with [`run`](Self::run) or step it
/// manually with [`claim_next`](Self::claim_next) and
/// [`complete_claim`](Self::complete_claim).
pub struct Worker {
  store: QueueStore,
  correlator: Correlator,
  transformer: Arc<dyn Transformer>,
  processed: ProcessedSet,
  state: WorkerState,
  idle_interval: Duration,
  error_backoff: Duration,
  arrival_poll: Duration,
}

impl Worker {
  pub fn new(store: QueueStore, correlator: Correlator, transformer: Arc<dyn Transformer>) -> Self {
    Self {
      store,
      correlator,
      transformer,
      processed: ProcessedSet::new(),
      state: WorkerState::Idle,
      idle_interval: Duration::from_secs(1),
      error_backoff: Duration::from_secs(5),
      arrival_poll: Duration::from_millis(500),
    }
  }

  pub fn from_config(config: &Config, transformer: Arc<dyn Transformer>) -> Self {
    let store = QueueStore::new(QueueLayout::new(config.state_root()));
    Self::new(store, Correlator::new(config.queue.response_naming), transformer)
      .with_intervals(config.worker.idle_interval(), config.worker.error_backoff())
      .with_arrival_poll(config.submit.poll_interval())
  }

  pub fn with_intervals(mut self, idle_interval: Duration, error_backoff: Duration) -> Self {
    self.idle_interval = idle_interval;
    self.error_backoff = error_backoff;
    self
  }

  pub fn with_arrival_poll(mut self, arrival_poll: Duration) -> Self {
    self.arrival_poll = arrival_poll;
    self
  }

  pub fn state(&self) -> WorkerState {
    self.state
  }

  pub fn processed(&self) -> &ProcessedSet {
    &self.processed
  }

  pub fn status(&self) -> WorkerStatus {
    WorkerStatus {
      state: self.state,
      processed: self.processed.len(),
      transformer: self.transformer.name().to_string(),
    }
  }

  /// Number of inbox requests this worker has not claimed yet
  pub async fn check_queue_depth(&self) -> Result<usize, WorkerError> {
    Ok(self.pending().await?.len())
  }

  /// Claim the oldest unprocessed request.
  ///
  /// The id is recorded as processed before anything that can fail, so a
  /// request is never picked twice by the same worker. Empty or unreadable
  /// requests are answered here with an `Error:` response and the scan moves
  /// on to the next candidate.
  pub async fn claim_next(&mut self) -> Result<Option<Claim>, WorkerError> {
    self.state = WorkerState::Scanning;
    let mut candidates = match self.pending().await {
      Ok(c) => c,
      Err(e) => {
        self.state = WorkerState::Idle;
        return Err(e.into());
      }
    };
    candidates.sort_by(|(_, a), (_, b)| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)));

    for (id, file) in candidates {
      self.processed.insert(id.clone());
      self.state = WorkerState::Claimed;

      let file = match self.store.claim(&file).await {
        Ok(claimed) => claimed,
        Err(e) if e.is_not_found() && !tokio::fs::try_exists(&file.path).await.unwrap_or(false) => {
          debug!(request_id = %id, "Request gone before claim");
          continue;
        }
        Err(e) if e.is_not_found() => {
          // The request is still there, so claimed/ itself is missing
          warn!(request_id = %id, "claimed/ is missing, recreating");
          match self.claim_after_ensure(&file).await {
            Ok(claimed) => claimed,
            Err(e) => {
              warn!(request_id = %id, err = %e, "Failed to move request to claimed/, processing in place");
              file
            }
          }
        }
        Err(e) => {
          warn!(request_id = %id, err = %e, "Failed to move request to claimed/, processing in place");
          file
        }
      };

      let reason = match self.store.read(&file).await {
        Ok(payload) if !payload.trim().is_empty() => {
          debug!(request_id = %id, bytes = payload.len(), "Claimed request");
          return Ok(Some(Claim { id, payload, file }));
        }
        Ok(_) => "request is empty".to_string(),
        Err(e) if e.is_not_found() => {
          debug!(request_id = %id, "Claimed request vanished");
          continue;
        }
        Err(QueueError::Malformed { reason, .. }) => reason,
        Err(e) => e.to_string(),
      };

      let err = WorkerError::Malformed(reason);
      warn!(request_id = %id, err = %err, "Rejecting request");
      if let Err(e) = self.finish(&id, &file, &format!("Error: {}", err)).await {
        warn!(request_id = %id, err = %e, "Failed to answer rejected request");
      }
      self.state = WorkerState::Scanning;
    }

    self.state = WorkerState::Idle;
    Ok(None)
  }

  /// Write `content` as the response to a request sitting in `claimed/`.
  ///
  /// Returns the response file name.
  pub async fn complete_claim(&mut self, id: &RequestId, content: &str) -> Result<String, WorkerError> {
    let file = match self.store.locate(Slot::Claimed, &id.file_name()).await {
      Ok(file) => file,
      Err(e) if e.is_not_found() => return Err(WorkerError::UnknownClaim(id.clone())),
      Err(e) => return Err(e.into()),
    };
    self.finish(id, &file, content).await
  }

  /// Transform a claimed payload and write the response.
  ///
  /// Transformer failures become an `Error:` response; only storage
  /// failures are returned.
  pub async fn process(&mut self, claim: Claim) -> Result<String, WorkerError> {
    self.state = WorkerState::Processing;
    let started = Instant::now();

    let content = match self.transformer.transform(&claim.payload).await {
      Ok(output) => output,
      Err(e) => {
        let err = WorkerError::from(e);
        warn!(request_id = %claim.id, err = %err, "Transformation failed");
        format!("Error: {}", err)
      }
    };

    trace!(
      request_id = %claim.id,
      elapsed_ms = started.elapsed().as_millis() as u64,
      "Transformation finished"
    );
    self.finish(&claim.id, &claim.file, &content).await
  }

  /// One scan/claim/process pass. Returns true if a request was handled.
  pub async fn run_cycle(&mut self) -> Result<bool, WorkerError> {
    match self.claim_next().await? {
      Some(claim) => {
        self.process(claim).await?;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  /// Loop until `cancel` fires.
  ///
  /// A handled request triggers an immediate rescan; an empty inbox sleeps
  /// `idle_interval`; a failed cycle sleeps `error_backoff`. Cancellation is
  /// observed between cycles and during sleeps, so an in-flight request is
  /// always finished.
  pub async fn run(mut self, cancel: CancellationToken) -> Self {
    info!(
      transformer = self.transformer.name(),
      naming = self.correlator.naming().as_str(),
      root = %self.store.layout().root().display(),
      "Worker started"
    );

    while !cancel.is_cancelled() {
      let pause = match self.run_cycle().await {
        Ok(true) => continue,
        Ok(false) => self.idle_interval,
        Err(e) => {
          error!(err = %e, "Worker cycle failed");
          self.state = WorkerState::Idle;
          self.error_backoff
        }
      };

      tokio::select! {
        biased;

        _ = cancel.cancelled() => break,
        _ = tokio::time::sleep(pause) => {}
      }
    }

    self.state = WorkerState::Stopped;
    info!(processed = self.processed.len(), "Worker stopped");
    self
  }

  /// Wait until at least one unclaimed request is in the inbox.
  ///
  /// Returns false if `timeout` elapses first.
  pub async fn wait_for_arrival(&self, timeout: Duration) -> Result<bool, WorkerError> {
    let deadline = Instant::now().checked_add(timeout);
    loop {
      if self.check_queue_depth().await? > 0 {
        return Ok(true);
      }

      let pause = match deadline {
        Some(deadline) => {
          let now = Instant::now();
          if now >= deadline {
            return Ok(false);
          }
          self.arrival_poll.min(deadline - now)
        }
        None => self.arrival_poll,
      };
      tokio::time::sleep(pause).await;
    }
  }

  async fn claim_after_ensure(&self, file: &FileRef) -> Result<FileRef, QueueError> {
    self.store.layout().ensure().await?;
    self.store.claim(file).await
  }

  async fn pending(&self) -> Result<Vec<(RequestId, FileRef)>, QueueError> {
    let files = self.store.list(Slot::Inbox, REQUEST_PATTERN).await?;
    Ok(
      files
        .into_iter()
        .filter_map(|f| f.request_id().map(|id| (id, f)))
        .filter(|(id, _)| !self.processed.contains(id))
        .collect(),
    )
  }

  /// Write the response and remove the request file, attempting both.
  async fn finish(&mut self, id: &RequestId, file: &FileRef, content: &str) -> Result<String, WorkerError> {
    self.state = WorkerState::Done;

    let name = self.correlator.response_file_name(id, Utc::now());
    let written = self.store.deposit(Slot::Outbox, &name, content).await;
    let removed = self.store.remove(file).await;
    self.state = WorkerState::Idle;

    match (written, removed) {
      (Ok(_), Ok(_)) => {
        info!(request_id = %id, response = %name, bytes = content.len(), "Response written");
        Ok(name)
      }
      (Ok(_), Err(e)) => {
        warn!(request_id = %id, err = %e, "Response written but request file was not removed");
        Ok(name)
      }
      (Err(e), _) => {
        error!(request_id = %id, response = %name, err = %e, "Failed to write response");
        Err(e.into())
      }
    }
  }
}
