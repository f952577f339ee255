//! Caller side of the queue: deposit a request, poll for its response.

use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::{
  domain::{config::Config, request::RequestId},
  queue::{Correlator, FileRef, QueueError, QueueLayout, QueueStore, Slot},
};

/// Id regeneration attempts when a deposit collides with a live request
const MAX_ID_ATTEMPTS: usize = 3;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
  #[error("Timed out after {:.1}s waiting for a response", .0.as_secs_f64())]
  Timeout(Duration),
  #[error("Could not allocate a unique request id after {0} attempts")]
  Collision(usize),
  #[error(transparent)]
  Queue(#[from] QueueError),
}

/// A request sitting in the inbox, waiting for its response
#[derive(Debug, Clone)]
pub struct PendingRequest {
  pub id: RequestId,
  file: FileRef,
  submitted_at: Instant,
}

impl PendingRequest {
  /// Inbox path the request was deposited at
  pub fn path(&self) -> &std::path::Path {
    &self.file.path
  }

  pub fn elapsed(&self) -> Duration {
    self.submitted_at.elapsed()
  }
}

#[derive(Debug, Clone)]
pub struct Submitter {
  store: QueueStore,
  correlator: Correlator,
  poll_interval: Duration,
}

impl Submitter {
  pub fn new(store: QueueStore, correlator: Correlator) -> Self {
    Self {
      store,
      correlator,
      poll_interval: DEFAULT_POLL_INTERVAL,
    }
  }

  pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
    self.poll_interval = poll_interval;
    self
  }

  pub fn from_config(config: &Config) -> Self {
    let store = QueueStore::new(QueueLayout::new(config.state_root()));
    Self::new(store, Correlator::new(config.queue.response_naming)).with_poll_interval(config.submit.poll_interval())
  }

  /// Submit `text` and wait up to `timeout` for the transformed result.
  ///
  /// On timeout the request is withdrawn from the inbox if no worker has
  /// claimed it yet.
  pub async fn submit(&self, text: &str, timeout: Duration) -> Result<String, SubmitError> {
    let pending = self.enqueue(text).await?;

    match self.wait(&pending, timeout).await {
      Err(SubmitError::Timeout(t)) => {
        self.withdraw(&pending).await;
        Err(SubmitError::Timeout(t))
      }
      other => other,
    }
  }

  /// Deposit `text` into the inbox under a fresh request id
  pub async fn enqueue(&self, text: &str) -> Result<PendingRequest, SubmitError> {
    self.store.layout().ensure().await?;

    for attempt in 1..=MAX_ID_ATTEMPTS {
      let id = self.correlator.new_request_id();
      match self.store.deposit_new(Slot::Inbox, &id.file_name(), text).await {
        Ok(file) => {
          debug!(request_id = %id, bytes = text.len(), "Request deposited");
          return Ok(PendingRequest {
            id,
            file,
            submitted_at: Instant::now(),
          });
        }
        Err(QueueError::AlreadyExists(_)) => {
          warn!(request_id = %id, attempt, "Request id already in use, regenerating");
        }
        Err(e) => return Err(e.into()),
      }
    }

    Err(SubmitError::Collision(MAX_ID_ATTEMPTS))
  }

  /// Poll the outbox for the response to `pending`.
  ///
  /// The matched response is read and deleted. Filesystem hiccups while
  /// polling are logged and retried on the next tick; only the deadline ends
  /// the wait. The inbox file is left alone on timeout.
  pub async fn wait(&self, pending: &PendingRequest, timeout: Duration) -> Result<String, SubmitError> {
    let pattern = self.correlator.response_pattern(&pending.id);
    // A timeout too large to represent waits forever
    let deadline = Instant::now().checked_add(timeout);

    loop {
      match self.collect(&pending.id, &pattern).await {
        Ok(Some(content)) => {
          info!(
            request_id = %pending.id,
            elapsed_ms = pending.elapsed().as_millis() as u64,
            "Response received"
          );
          return Ok(content);
        }
        Ok(None) => {}
        Err(e) if e.is_not_found() => {
          trace!(request_id = %pending.id, "Response vanished before read, retrying");
        }
        Err(e) => {
          warn!(request_id = %pending.id, err = %e, "Failed to poll outbox, retrying");
        }
      }

      let pause = match deadline {
        Some(deadline) => {
          let now = Instant::now();
          if now >= deadline {
            warn!(
              request_id = %pending.id,
              timeout_ms = timeout.as_millis() as u64,
              "Timed out waiting for response"
            );
            return Err(SubmitError::Timeout(timeout));
          }
          self.poll_interval.min(deadline - now)
        }
        None => self.poll_interval,
      };
      tokio::time::sleep(pause).await;
    }
  }

  /// Remove the request from the inbox if no worker has claimed it.
  ///
  /// Returns true when the request was withdrawn. A claimed request is still
  /// processed and its response is left in the outbox unread.
  pub async fn withdraw(&self, pending: &PendingRequest) -> bool {
    match self.store.remove(&pending.file).await {
      Ok(true) => {
        info!(request_id = %pending.id, "Withdrew unclaimed request");
        true
      }
      Ok(false) => {
        debug!(request_id = %pending.id, "Request already claimed, nothing to withdraw");
        false
      }
      Err(_) => false,
    }
  }

  async fn collect(&self, id: &RequestId, pattern: &str) -> Result<Option<String>, QueueError> {
    let mut matches = self.store.list(Slot::Outbox, pattern).await?;
    matches.retain(|f| self.correlator.is_response_for(id, &f.name));
    matches.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)));

    let Some(file) = matches.into_iter().next() else {
      return Ok(None);
    };

    let content = self.store.read(&file).await?;
    // Removal failures are logged by the store; the content is already ours
    let _ = self.store.remove(&file).await;
    Ok(Some(content))
  }
}
