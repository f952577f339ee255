//! End-to-end submit/process/collect scenarios through real directories.

#[cfg(test)]
mod tests {
  use std::{
    sync::Arc,
    time::{Duration, Instant},
  };

  use pretty_assertions::assert_eq;
  use tokio::task::JoinSet;

  use crate::{
    __tests__::helpers::TestQueue,
    config::ResponseNaming,
    submit::SubmitError,
    worker::{Identity, Uppercase, WorkerHandle},
  };

  #[tokio::test]
  async fn test_identity_round_trip() {
    let queue = TestQueue::new().await;
    let mut handle = WorkerHandle::spawn(queue.worker(Arc::new(Identity)));

    let payload = "first line\nsecond line\n  indented, with trailing space ";
    let result = queue.submitter().submit(payload, Duration::from_secs(5)).await.unwrap();
    assert_eq!(result, payload);

    let worker = handle.stop().await.unwrap();
    assert_eq!(worker.processed().len(), 1);
    assert!(queue.files("inbox").is_empty());
    assert!(queue.files("claimed").is_empty());
    assert!(queue.files("outbox").is_empty());
  }

  #[tokio::test]
  async fn test_uppercase_scenario() {
    let queue = TestQueue::new().await;
    let mut handle = WorkerHandle::spawn(queue.worker(Arc::new(Uppercase)));

    let result = queue
      .submitter()
      .submit("helo wrold", Duration::from_secs(5))
      .await
      .unwrap();
    assert_eq!(result, "HELO WROLD");

    handle.stop().await;
    assert!(queue.files("inbox").is_empty());
    assert!(queue.files("outbox").is_empty());
  }

  #[tokio::test]
  async fn test_concurrent_submits_get_their_own_responses() {
    let queue = TestQueue::new().await;
    let mut handle = WorkerHandle::spawn(queue.worker(Arc::new(Identity)));

    let mut tasks = JoinSet::new();
    for i in 0..10 {
      let submitter = queue.submitter();
      tasks.spawn(async move {
        let payload = format!("payload number {}", i);
        let result = submitter.submit(&payload, Duration::from_secs(10)).await;
        (payload, result)
      });
    }

    while let Some(joined) = tasks.join_next().await {
      let (payload, result) = joined.unwrap();
      assert_eq!(result.unwrap(), payload);
    }

    let worker = handle.stop().await.unwrap();
    assert_eq!(worker.processed().len(), 10);
    assert!(queue.files("outbox").is_empty());
  }

  #[tokio::test]
  async fn test_suffixed_round_trip() {
    let queue = TestQueue::with_naming(ResponseNaming::Suffixed).await;
    let mut handle = WorkerHandle::spawn(queue.worker(Arc::new(Uppercase)));

    let result = queue.submitter().submit("abc", Duration::from_secs(5)).await.unwrap();
    assert_eq!(result, "ABC");

    handle.stop().await;
    assert!(queue.files("outbox").is_empty());
  }

  #[tokio::test]
  async fn test_empty_payload_answered_with_error() {
    let queue = TestQueue::new().await;
    let mut handle = WorkerHandle::spawn(queue.worker(Arc::new(Identity)));

    let started = Instant::now();
    let result = queue.submitter().submit("", Duration::from_secs(5)).await.unwrap();
    assert!(result.starts_with("Error:"), "unexpected response: {}", result);
    assert!(started.elapsed() < Duration::from_secs(2));

    handle.stop().await;
    assert!(queue.files("inbox").is_empty());
    assert!(queue.files("claimed").is_empty());
  }

  #[tokio::test]
  async fn test_timeout_without_worker() {
    let queue = TestQueue::new().await;

    let started = Instant::now();
    let err = queue
      .submitter()
      .submit("anyone there?", Duration::from_secs(1))
      .await
      .unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, SubmitError::Timeout(_)));
    assert!(elapsed >= Duration::from_millis(500), "returned too early: {:?}", elapsed);
    assert!(elapsed <= Duration::from_millis(1500), "returned too late: {:?}", elapsed);
    assert!(queue.files("inbox").is_empty());
  }
}
