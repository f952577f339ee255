//! Editable prompt template prepended to every payload before inference.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::queue::{QueueError, QueueLayout, write_atomic};

/// Written to `prompt.txt` the first time a worker starts
pub const DEFAULT_PROMPT: &str = "Process the following text according to these instructions:

1. Fix any grammar or spelling errors
2. Improve clarity and conciseness
3. Maintain the original tone and intent
4. Return only the processed text without explanations

Text to process:
";

/// Used when `prompt.txt` cannot be read
pub const FALLBACK_PROMPT: &str = "Process this text:\n";

#[derive(Debug, Clone)]
pub struct PromptStore {
  path: PathBuf,
}

impl PromptStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn for_layout(layout: &QueueLayout) -> Self {
    Self::new(layout.prompt_file())
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Create the prompt file with [`DEFAULT_PROMPT`] if it doesn't exist.
  ///
  /// Returns true if the file was created.
  pub async fn ensure_default(&self) -> Result<bool, QueueError> {
    if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
      return Ok(false);
    }

    if let Some(parent) = self.path.parent() {
      tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| QueueError::from_io(parent, e))?;
    }

    write_atomic(&self.path, DEFAULT_PROMPT).await?;
    info!(path = %self.path.display(), "Created default prompt");
    Ok(true)
  }

  /// Read the current prompt
  pub async fn read(&self) -> Result<String, QueueError> {
    tokio::fs::read_to_string(&self.path)
      .await
      .map_err(|e| QueueError::from_io(&self.path, e))
  }

  /// Read the current prompt, falling back to [`FALLBACK_PROMPT`]
  pub async fn load(&self) -> String {
    match self.read().await {
      Ok(prompt) => prompt,
      Err(e) => {
        warn!(path = %self.path.display(), err = %e, "Failed to read prompt, using fallback");
        FALLBACK_PROMPT.to_string()
      }
    }
  }

  /// Replace the prompt
  pub async fn update(&self, prompt: &str) -> Result<(), QueueError> {
    write_atomic(&self.path, prompt).await?;
    debug!(path = %self.path.display(), len = prompt.len(), "Prompt updated");
    Ok(())
  }

  /// Restore [`DEFAULT_PROMPT`]
  pub async fn reset(&self) -> Result<(), QueueError> {
    self.update(DEFAULT_PROMPT).await
  }
}

/// Full inference input for a payload
pub fn combine(prompt: &str, payload: &str) -> String {
  format!("{}\n{}", prompt, payload)
}
