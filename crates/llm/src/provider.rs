//! LLM provider trait
//!
//! The worker only needs "prompt in, text out"; each backend implements
//! [`LlmProvider`] for that.

use async_trait::async_trait;

use crate::{InferenceRequest, InferenceResponse, LlmError};

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LlmError>;

/// Trait for LLM inference providers
///
/// # Example
///
/// ```ignore
/// use llm::{InferenceRequest, InferenceResponse, LlmProvider, Result};
///
/// struct Echo;
///
/// #[async_trait::async_trait]
/// impl LlmProvider for Echo {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     fn is_available(&self) -> bool {
///         true
///     }
///
///     async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse> {
///         Ok(InferenceResponse {
///             text: request.prompt,
///             input_tokens: 0,
///             output_tokens: 0,
///             cost_usd: None,
///             duration_ms: 0,
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait LlmProvider: Send + Sync {
  /// The name of this provider (for logging)
  fn name(&self) -> &str;

  /// Whether the provider can be used (CLI on PATH, credentials present, ...)
  fn is_available(&self) -> bool;

  /// Run a single inference request
  async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse>;
}
