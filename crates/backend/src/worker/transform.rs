//! Payload transformers applied by the worker.
//!
//! The worker doesn't care what a transformation does; it hands the payload
//! to a [`Transformer`] and writes whatever comes back (or the error) to the
//! outbox.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

#[cfg(feature = "claude")]
use crate::prompt::{self, PromptStore};
use crate::domain::config::{Config, TransformKind};

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
  #[cfg(feature = "claude")]
  #[error("{0}")]
  Llm(#[from] llm::LlmError),
  #[error("Transformer unavailable: {0}")]
  Unavailable(String),
  #[error("Transformer returned an empty result")]
  EmptyOutput,
}

#[async_trait]
pub trait Transformer: Send + Sync {
  /// Short name for logging
  fn name(&self) -> &str;

  async fn transform(&self, payload: &str) -> Result<String, TransformError>;
}

/// Returns the payload unchanged
#[derive(Debug, Clone, Default)]
pub struct Identity;

#[async_trait]
impl Transformer for Identity {
  fn name(&self) -> &str {
    "identity"
  }

  async fn transform(&self, payload: &str) -> Result<String, TransformError> {
    Ok(payload.to_string())
  }
}

/// Upper-cases the payload
#[derive(Debug, Clone, Default)]
pub struct Uppercase;

#[async_trait]
impl Transformer for Uppercase {
  fn name(&self) -> &str {
    "uppercase"
  }

  async fn transform(&self, payload: &str) -> Result<String, TransformError> {
    Ok(payload.to_uppercase())
  }
}

/// Sends `prompt + "\n" + payload` to an LLM provider.
///
/// The prompt is re-read for every request so edits to `prompt.txt` take
/// effect without restarting the worker.
#[cfg(feature = "claude")]
pub struct PromptTransformer {
  prompts: PromptStore,
  provider: Box<dyn llm::LlmProvider>,
  model: String,
  timeout_secs: u64,
}

#[cfg(feature = "claude")]
impl PromptTransformer {
  pub fn new(prompts: PromptStore, provider: Box<dyn llm::LlmProvider>, model: impl Into<String>, timeout_secs: u64) -> Self {
    Self {
      prompts,
      provider,
      model: model.into(),
      timeout_secs,
    }
  }
}

#[cfg(feature = "claude")]
#[async_trait]
impl Transformer for PromptTransformer {
  fn name(&self) -> &str {
    self.provider.name()
  }

  async fn transform(&self, payload: &str) -> Result<String, TransformError> {
    let template = self.prompts.load().await;
    let request = llm::InferenceRequest::new(prompt::combine(&template, payload))
      .with_model(&self.model)
      .with_timeout(self.timeout_secs);

    let response = self.provider.infer(request).await?;
    let text = response.text.trim();
    if text.is_empty() {
      return Err(TransformError::EmptyOutput);
    }
    Ok(text.to_string())
  }
}

/// Build the transformer selected by `kind`.
///
/// `prompt_file` is only used by the Claude transformer.
#[cfg_attr(not(feature = "claude"), allow(unused_variables))]
pub fn from_config(
  kind: TransformKind,
  config: &Config,
  prompt_file: std::path::PathBuf,
) -> Result<Arc<dyn Transformer>, TransformError> {
  let transformer: Arc<dyn Transformer> = match kind {
    TransformKind::Identity => Arc::new(Identity),
    TransformKind::Uppercase => Arc::new(Uppercase),
    #[cfg(feature = "claude")]
    TransformKind::Claude => {
      let provider = llm::create_provider()?;
      Arc::new(PromptTransformer::new(
        PromptStore::new(prompt_file),
        provider,
        config.transform.model.clone(),
        config.transform.timeout_secs,
      ))
    }
    #[cfg(not(feature = "claude"))]
    TransformKind::Claude => {
      return Err(TransformError::Unavailable(
        "built without the `claude` feature".to_string(),
      ));
    }
  };

  info!(transformer = transformer.name(), "Transformer ready");
  Ok(transformer)
}
