//! Directory operations behind the queue: atomic deposit, pattern listing,
//! read, claim (rename into `claimed/`) and removal.

use std::{
  io::Write,
  path::{Path, PathBuf},
  time::SystemTime,
};

use glob::{MatchOptions, Pattern};
use tracing::{debug, trace, warn};

use super::{QueueError, QueueLayout, Slot};
use crate::domain::request::RequestId;

/// Prefix of in-progress temp files; never matches a `*.txt` listing
const TEMP_PREFIX: &str = ".quill-";
const TEMP_SUFFIX: &str = ".tmp";

/// Leading-dot names (temp files) never match a wildcard
const MATCH_OPTIONS: MatchOptions = MatchOptions {
  case_sensitive: true,
  require_literal_separator: false,
  require_literal_leading_dot: true,
};

/// A file observed in one of the queue directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
  pub path: PathBuf,
  pub name: String,
  pub modified: SystemTime,
}

impl FileRef {
  /// Request id carried by this file's name, if it is a request file
  pub fn request_id(&self) -> Option<RequestId> {
    RequestId::from_file_name(&self.name)
  }
}

/// Filesystem store for a queue layout
#[derive(Debug, Clone)]
pub struct QueueStore {
  layout: QueueLayout,
}

impl QueueStore {
  pub fn new(layout: QueueLayout) -> Self {
    Self { layout }
  }

  pub fn layout(&self) -> &QueueLayout {
    &self.layout
  }

  /// Write `content` to `slot/name`, replacing any existing file.
  ///
  /// The content is written to a hidden temp file in the same directory and
  /// renamed into place, so a poller never observes a partial file.
  pub async fn deposit(&self, slot: Slot, name: &str, content: &str) -> Result<FileRef, QueueError> {
    let path = self.layout.dir(slot).join(name);
    persist(path.clone(), content.to_string(), true).await?;
    trace!(slot = slot.as_str(), name, bytes = content.len(), "Deposited file");
    Ok(self.observed(path, name).await)
  }

  /// Like [`deposit`](Self::deposit) but fails with `AlreadyExists` instead of
  /// replacing a live file.
  pub async fn deposit_new(&self, slot: Slot, name: &str, content: &str) -> Result<FileRef, QueueError> {
    let path = self.layout.dir(slot).join(name);
    persist(path.clone(), content.to_string(), false).await?;
    trace!(slot = slot.as_str(), name, bytes = content.len(), "Deposited new file");
    Ok(self.observed(path, name).await)
  }

  /// List files in `slot` whose name matches the glob `pattern`.
  ///
  /// Every call re-scans the directory. Ordering is unspecified; callers
  /// that care sort explicitly. Files that vanish mid-scan are skipped.
  pub async fn list(&self, slot: Slot, pattern: &str) -> Result<Vec<FileRef>, QueueError> {
    let matcher = Pattern::new(pattern).map_err(|e| QueueError::Pattern {
      pattern: pattern.to_string(),
      message: e.msg.to_string(),
    })?;

    let dir = self.layout.dir(slot);
    let mut entries = tokio::fs::read_dir(dir)
      .await
      .map_err(|e| QueueError::from_io(dir, e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| QueueError::from_io(dir, e))? {
      let Ok(name) = entry.file_name().into_string() else {
        continue;
      };

      if !matcher.matches_with(&name, MATCH_OPTIONS) {
        continue;
      }

      let metadata = match entry.metadata().await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
          trace!(name = %name, "File vanished during listing");
          continue;
        }
        Err(e) => {
          warn!(name = %name, err = %e, "Failed to stat queue file");
          continue;
        }
      };

      if !metadata.is_file() {
        continue;
      }

      files.push(FileRef {
        path: entry.path(),
        modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        name,
      });
    }

    Ok(files)
  }

  /// Stat a single file by name
  pub async fn locate(&self, slot: Slot, name: &str) -> Result<FileRef, QueueError> {
    let path = self.layout.dir(slot).join(name);
    let metadata = tokio::fs::metadata(&path)
      .await
      .map_err(|e| QueueError::from_io(&path, e))?;

    Ok(FileRef {
      modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
      name: name.to_string(),
      path,
    })
  }

  /// Read the full content of a file.
  ///
  /// Returns `NotFound` when the file disappeared after being listed; callers
  /// treat that as "try again".
  pub async fn read(&self, file: &FileRef) -> Result<String, QueueError> {
    tokio::fs::read_to_string(&file.path)
      .await
      .map_err(|e| QueueError::from_io(&file.path, e))
  }

  /// Move a file into the claimed directory, keeping its name.
  pub async fn claim(&self, file: &FileRef) -> Result<FileRef, QueueError> {
    let target = self.layout.dir(Slot::Claimed).join(&file.name);
    tokio::fs::rename(&file.path, &target)
      .await
      .map_err(|e| QueueError::from_io(&file.path, e))?;

    debug!(name = %file.name, "Claimed file");
    Ok(FileRef {
      path: target,
      name: file.name.clone(),
      modified: file.modified,
    })
  }

  /// Delete a file. A file that is already gone is not an error.
  ///
  /// Returns whether this call removed it.
  pub async fn remove(&self, file: &FileRef) -> Result<bool, QueueError> {
    match tokio::fs::remove_file(&file.path).await {
      Ok(()) => {
        trace!(name = %file.name, "Removed file");
        Ok(true)
      }
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        debug!(name = %file.name, "File already removed");
        Ok(false)
      }
      Err(e) => {
        warn!(path = %file.path.display(), err = %e, "Failed to remove file");
        Err(QueueError::from_io(&file.path, e))
      }
    }
  }

  async fn observed(&self, path: PathBuf, name: &str) -> FileRef {
    let modified = tokio::fs::metadata(&path)
      .await
      .and_then(|m| m.modified())
      .unwrap_or_else(|_| SystemTime::now());

    FileRef {
      path,
      name: name.to_string(),
      modified,
    }
  }
}

/// Atomically replace the file at `path` with `content`
pub async fn write_atomic(path: &Path, content: &str) -> Result<(), QueueError> {
  persist(path.to_path_buf(), content.to_string(), true).await
}

async fn persist(path: PathBuf, content: String, overwrite: bool) -> Result<(), QueueError> {
  let target = path.clone();
  tokio::task::spawn_blocking(move || persist_blocking(&target, content.as_bytes(), overwrite))
    .await
    .map_err(|e| QueueError::Io {
      path,
      source: std::io::Error::other(e),
    })?
}

fn persist_blocking(path: &Path, data: &[u8], overwrite: bool) -> Result<(), QueueError> {
  let dir = path.parent().unwrap_or(Path::new("."));

  let mut tmp = tempfile::Builder::new()
    .prefix(TEMP_PREFIX)
    .suffix(TEMP_SUFFIX)
    .tempfile_in(dir)
    .map_err(|e| QueueError::from_io(dir, e))?;

  tmp.write_all(data).map_err(|e| QueueError::from_io(path, e))?;
  tmp.as_file().sync_data().map_err(|e| QueueError::from_io(path, e))?;

  let persisted = if overwrite {
    tmp.persist(path)
  } else {
    tmp.persist_noclobber(path)
  };

  // On failure the temp file is dropped (and deleted) with the error
  persisted.map_err(|e| QueueError::from_io(path, e.error))?;
  Ok(())
}
