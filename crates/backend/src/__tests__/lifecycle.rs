//! Worker start/stop, crash and restart behavior.

#[cfg(test)]
mod tests {
  use std::{sync::Arc, time::Duration};

  use async_trait::async_trait;
  use pretty_assertions::assert_eq;

  use crate::{
    __tests__::helpers::TestQueue,
    status::QueueStatus,
    submit::SubmitError,
    worker::{Identity, TransformError, Transformer, Uppercase, WorkerHandle},
  };

  /// Takes a while, so tests can stop the worker mid-request
  struct Slow(Duration);

  #[async_trait]
  impl Transformer for Slow {
    fn name(&self) -> &str {
      "slow"
    }

    async fn transform(&self, payload: &str) -> Result<String, TransformError> {
      tokio::time::sleep(self.0).await;
      Ok(payload.to_string())
    }
  }

  #[tokio::test]
  async fn test_crash_after_claim_loses_request() {
    let queue = TestQueue::new().await;
    let submitter = queue.submitter();
    let pending = submitter.enqueue("doomed").await.unwrap();

    // Claim, then "crash" before processing
    let mut worker = queue.worker(Arc::new(Identity));
    let claim = worker.claim_next().await.unwrap().unwrap();
    assert_eq!(claim.id, pending.id);
    drop(worker);

    let err = submitter.wait(&pending, Duration::from_millis(200)).await.unwrap_err();
    assert!(matches!(err, SubmitError::Timeout(_)));

    // A fresh worker does not rediscover it
    let mut fresh = queue.worker(Arc::new(Identity));
    assert!(fresh.claim_next().await.unwrap().is_none());
    assert!(queue.files("inbox").is_empty());
    assert!(queue.files("outbox").is_empty());
    assert_eq!(queue.files("claimed"), vec![pending.id.file_name()]);

    let status = QueueStatus::collect(&queue.layout, queue.naming).await.unwrap();
    assert_eq!(status.in_flight, vec![pending.id.file_name()]);
  }

  #[tokio::test]
  async fn test_requests_wait_while_stopped() {
    let queue = TestQueue::new().await;
    let mut handle = WorkerHandle::spawn(queue.worker(Arc::new(Uppercase)));
    handle.stop().await.unwrap();
    assert!(!handle.is_running());

    let submitter = queue.submitter();
    let pending = submitter.enqueue("later").await.unwrap();
    let err = submitter.wait(&pending, Duration::from_millis(150)).await.unwrap_err();
    assert!(matches!(err, SubmitError::Timeout(_)));
    assert_eq!(queue.files("inbox"), vec![pending.id.file_name()]);

    // Restarting picks it up
    let mut handle = WorkerHandle::spawn(queue.worker(Arc::new(Uppercase)));
    let result = submitter.wait(&pending, Duration::from_secs(5)).await.unwrap();
    assert_eq!(result, "LATER");
    handle.stop().await;
  }

  #[tokio::test]
  async fn test_stop_finishes_in_flight_request() {
    let queue = TestQueue::new().await;
    let submitter = queue.submitter();
    let pending = submitter.enqueue("slow one").await.unwrap();

    let mut handle = WorkerHandle::spawn(queue.worker(Arc::new(Slow(Duration::from_millis(300)))));
    // Let the worker claim it
    for _ in 0..50 {
      if queue.files("inbox").is_empty() {
        break;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let worker = handle.stop().await.unwrap();
    assert_eq!(worker.processed().len(), 1);
    assert_eq!(queue.files("outbox"), vec![pending.id.file_name()]);
    assert!(queue.files("claimed").is_empty());

    let result = submitter.wait(&pending, Duration::from_secs(1)).await.unwrap();
    assert_eq!(result, "slow one");
  }

  #[tokio::test]
  async fn test_external_request_file_is_processed() {
    let queue = TestQueue::new().await;
    std::fs::write(queue.path("inbox").join("my notes.txt"), "external").unwrap();

    let mut worker = queue.worker(Arc::new(Uppercase));
    assert!(worker.wait_for_arrival(Duration::from_millis(100)).await.unwrap());
    assert!(worker.run_cycle().await.unwrap());

    assert_eq!(queue.files("outbox"), vec!["my notes.txt".to_string()]);
    assert_eq!(
      std::fs::read_to_string(queue.path("outbox").join("my notes.txt")).unwrap(),
      "EXTERNAL"
    );
  }

  #[tokio::test]
  async fn test_manual_claim_and_complete() {
    let queue = TestQueue::new().await;
    let submitter = queue.submitter();
    let pending = submitter.enqueue("by hand").await.unwrap();

    let mut worker = queue.worker(Arc::new(Identity));
    assert_eq!(worker.check_queue_depth().await.unwrap(), 1);
    let claim = worker.claim_next().await.unwrap().unwrap();
    assert_eq!(claim.payload, "by hand");

    worker.complete_claim(&claim.id, "done by hand").await.unwrap();
    let result = submitter.wait(&pending, Duration::from_secs(1)).await.unwrap();
    assert_eq!(result, "done by hand");
  }
}
