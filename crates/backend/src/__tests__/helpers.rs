//! Shared fixtures for queue scenario tests.

use std::{path::PathBuf, sync::Arc, time::Duration};

use tempfile::TempDir;

use crate::{
  config::ResponseNaming,
  queue::{Correlator, QueueLayout, QueueStore},
  submit::Submitter,
  worker::{Transformer, Worker},
};

/// A queue rooted in a temp directory, with intervals short enough for tests
pub struct TestQueue {
  _temp_dir: TempDir,
  pub layout: QueueLayout,
  pub naming: ResponseNaming,
}

impl TestQueue {
  pub async fn new() -> Self {
    Self::with_naming(ResponseNaming::Exact).await
  }

  pub async fn with_naming(naming: ResponseNaming) -> Self {
    let temp_dir = TempDir::new().expect("create temp dir");
    let layout = QueueLayout::new(temp_dir.path());
    layout.ensure().await.expect("create queue directories");
    Self {
      _temp_dir: temp_dir,
      layout,
      naming,
    }
  }

  pub fn store(&self) -> QueueStore {
    QueueStore::new(self.layout.clone())
  }

  pub fn submitter(&self) -> Submitter {
    Submitter::new(self.store(), Correlator::new(self.naming)).with_poll_interval(Duration::from_millis(50))
  }

  pub fn worker(&self, transformer: Arc<dyn Transformer>) -> Worker {
    Worker::new(self.store(), Correlator::new(self.naming), transformer)
      .with_intervals(Duration::from_millis(20), Duration::from_millis(50))
      .with_arrival_poll(Duration::from_millis(20))
  }

  pub fn path(&self, dir: &str) -> PathBuf {
    self.layout.root().join(dir)
  }

  /// Sorted file names in one of the queue directories
  pub fn files(&self, dir: &str) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(self.path(dir))
      .expect("read queue directory")
      .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
      .collect();
    names.sort();
    names
  }
}
