use std::path::{Path, PathBuf};

use tracing::debug;

use super::QueueError;

/// Directory within the state root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
  /// Pending requests
  Inbox,
  /// Requests a worker has taken ownership of
  Claimed,
  /// Completed responses awaiting pickup
  Outbox,
}

impl Slot {
  pub fn as_str(&self) -> &'static str {
    match self {
      Slot::Inbox => "inbox",
      Slot::Claimed => "claimed",
      Slot::Outbox => "outbox",
    }
  }
}

/// Paths of a queue rooted at one state directory
#[derive(Debug, Clone)]
pub struct QueueLayout {
  root: PathBuf,
  inbox: PathBuf,
  claimed: PathBuf,
  outbox: PathBuf,
}

impl QueueLayout {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    let root = root.into();
    Self {
      inbox: root.join(Slot::Inbox.as_str()),
      claimed: root.join(Slot::Claimed.as_str()),
      outbox: root.join(Slot::Outbox.as_str()),
      root,
    }
  }

  /// Create the queue directories if they don't exist
  pub async fn ensure(&self) -> Result<(), QueueError> {
    for dir in [&self.inbox, &self.claimed, &self.outbox] {
      tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| QueueError::from_io(dir, e))?;
    }
    debug!(root = %self.root.display(), "Queue directories ready");
    Ok(())
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn dir(&self, slot: Slot) -> &Path {
    match slot {
      Slot::Inbox => &self.inbox,
      Slot::Claimed => &self.claimed,
      Slot::Outbox => &self.outbox,
    }
  }

  /// Editable transformation instructions
  pub fn prompt_file(&self) -> PathBuf {
    self.root.join("prompt.txt")
  }

  /// PID file written by a running worker
  pub fn pid_file(&self) -> PathBuf {
    self.root.join("worker.pid")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[tokio::test]
  async fn test_ensure_creates_directories() {
    let temp = TempDir::new().unwrap();
    let layout = QueueLayout::new(temp.path().join("state"));
    layout.ensure().await.unwrap();

    assert!(layout.dir(Slot::Inbox).is_dir());
    assert!(layout.dir(Slot::Claimed).is_dir());
    assert!(layout.dir(Slot::Outbox).is_dir());
    assert_eq!(layout.prompt_file(), temp.path().join("state").join("prompt.txt"));

    // Idempotent
    layout.ensure().await.unwrap();
  }
}
