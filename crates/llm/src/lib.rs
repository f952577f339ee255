mod provider;

#[cfg(feature = "claude")]
mod claude;

#[cfg(feature = "claude")]
pub use claude::ClaudeProvider;
pub use provider::{LlmProvider, Result};

/// Create the default LLM provider based on available features
///
/// Returns the first available provider in priority order:
/// 1. Claude CLI (if `claude` feature is enabled)
///
/// Returns an error if no provider is available.
pub fn create_provider() -> Result<Box<dyn LlmProvider>> {
  #[cfg(feature = "claude")]
  {
    let provider = claude::ClaudeProvider::new();
    if provider.is_available() {
      return Ok(Box::new(provider));
    }
    Err(LlmError::ClaudeNotFound)
  }

  #[cfg(not(feature = "claude"))]
  {
    Err(LlmError::NoProviderAvailable)
  }
}

/// Request for LLM inference
#[derive(Debug, Clone)]
pub struct InferenceRequest {
  /// The prompt to send
  pub prompt: String,
  /// Model to use
  pub model: String,
  /// Timeout in seconds (default: 60)
  pub timeout_secs: u64,
}

impl Default for InferenceRequest {
  fn default() -> Self {
    Self {
      prompt: String::new(),
      model: "sonnet".to_string(),
      timeout_secs: 60,
    }
  }
}

impl InferenceRequest {
  /// Plain text request with default model and timeout
  pub fn new(prompt: impl Into<String>) -> Self {
    Self {
      prompt: prompt.into(),
      ..Default::default()
    }
  }

  pub fn with_model(mut self, model: impl Into<String>) -> Self {
    self.model = model.into();
    self
  }

  pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
    self.timeout_secs = timeout_secs;
    self
  }
}

/// Response from LLM inference
#[derive(Debug, Clone)]
pub struct InferenceResponse {
  /// The text response
  pub text: String,
  /// Input tokens used
  pub input_tokens: u32,
  /// Output tokens generated
  pub output_tokens: u32,
  /// Cost in USD (if available)
  pub cost_usd: Option<f64>,
  /// Duration in milliseconds
  pub duration_ms: u64,
}

/// Errors that can occur during LLM inference
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
  #[error("Failed to spawn process: {0}")]
  SpawnFailed(#[from] std::io::Error),
  #[error("process timed out after {0} seconds")]
  Timeout(u64),
  #[error("process exited with non-zero status: {0}")]
  ProcessFailed(i32),
  #[error("Failed to parse JSON response: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("No assistant message in response")]
  NoResponse,
  #[error("No LLM provider available. Enable a provider feature (e.g., 'claude').")]
  NoProviderAvailable,
  #[cfg(feature = "claude")]
  #[error("Claude executable not found. Ensure 'claude' is in your PATH.")]
  ClaudeNotFound,
  #[cfg(feature = "claude")]
  #[error("Claude returned an error: {0}")]
  ClaudeError(String),
}
