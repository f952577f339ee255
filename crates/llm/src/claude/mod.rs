//! Text inference via the Claude CLI
//!
//! Invokes `claude` in print mode with JSON output, feeding the prompt on
//! stdin. Hooks, plugins and tools are disabled so the CLI only generates
//! text.

use std::{
  process::Stdio,
  time::{Duration, Instant},
};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::{
  io::{AsyncReadExt, AsyncWriteExt},
  process::Command,
  time::timeout,
};
use tracing::{debug, error, trace, warn};

use crate::{InferenceRequest, InferenceResponse, LlmError, LlmProvider, Result};

/// Claude CLI provider for LLM inference
#[derive(Debug, Clone)]
pub struct ClaudeProvider {
  /// Cached path to the claude executable
  claude_path: String,
}

impl ClaudeProvider {
  /// Create a new Claude provider
  ///
  /// Attempts to find the claude executable in PATH.
  /// Use `is_available()` to check if the provider can be used.
  pub fn new() -> Self {
    Self {
      claude_path: find_claude().unwrap_or_default(),
    }
  }
}

impl Default for ClaudeProvider {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
  fn name(&self) -> &str {
    "claude-cli"
  }

  fn is_available(&self) -> bool {
    !self.claude_path.is_empty()
  }

  async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse> {
    if self.claude_path.is_empty() {
      return Err(LlmError::ClaudeNotFound);
    }
    infer_internal(&self.claude_path, request).await
  }
}

// Claude CLI JSON output

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
enum ClaudeMessage {
  User {},
  System {},
  Assistant(AssistantMessage),
  Result(ResultMessage),
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
  message: MessageContent,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
  content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
enum ContentBlock {
  Text {
    text: String,
  },
  #[serde(other)]
  Other,
}

#[derive(Debug, Deserialize)]
struct ResultMessage {
  #[serde(default)]
  is_error: bool,
  #[serde(default)]
  duration_ms: u64,
  #[serde(default)]
  total_cost_usd: f64,
  usage: Option<Usage>,
  result: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
  input_tokens: u32,
  output_tokens: u32,
}

/// Find the claude executable in PATH
fn find_claude() -> Result<String> {
  let which_cmd = if cfg!(windows) { "where" } else { "which" };

  let output = std::process::Command::new(which_cmd)
    .arg("claude")
    .output()
    .map_err(|e| {
      debug!(err = %e, "Failed to execute 'which claude'");
      LlmError::ClaudeNotFound
    })?;

  if !output.status.success() {
    debug!("Claude executable not found in PATH");
    return Err(LlmError::ClaudeNotFound);
  }

  let path = String::from_utf8_lossy(&output.stdout)
    .lines()
    .next()
    .map(|s| s.trim().to_string())
    .ok_or(LlmError::ClaudeNotFound)?;

  if path.is_empty() {
    return Err(LlmError::ClaudeNotFound);
  }

  trace!(claude_path = %path, "Found claude executable");
  Ok(path)
}

fn build_command(claude_path: &str, request: &InferenceRequest) -> Command {
  let mut cmd = Command::new(claude_path);
  cmd
    .arg("-p")
    .arg("--model")
    .arg(&request.model)
    .arg("--output-format")
    .arg("json")
    .arg("--no-session-persistence")
    .arg("--settings")
    .arg(r#"{"hooks":{}}"#)
    .arg("--setting-sources")
    .arg("")
    .arg("--tools")
    .arg("")
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::null())
    .kill_on_drop(true);
  cmd
}

async fn infer_internal(claude_path: &str, request: InferenceRequest) -> Result<InferenceResponse> {
  let start = Instant::now();

  debug!(
    model = %request.model,
    prompt_len = request.prompt.len(),
    timeout_secs = request.timeout_secs,
    "Starting inference request"
  );

  let mut child = build_command(claude_path, &request).spawn().map_err(|e| {
    error!(err = %e, "Failed to spawn Claude CLI process");
    LlmError::SpawnFailed(e)
  })?;

  if let Some(mut stdin) = child.stdin.take() {
    stdin.write_all(request.prompt.as_bytes()).await?;
    // Closing stdin ends the prompt
    drop(stdin);
  }

  let mut stdout = child
    .stdout
    .take()
    .ok_or_else(|| std::io::Error::other("stdout not piped"))?;

  let read_future = async {
    let mut output = String::new();
    stdout.read_to_string(&mut output).await?;
    Ok::<_, std::io::Error>(output)
  };

  let output = match timeout(Duration::from_secs(request.timeout_secs), read_future).await {
    Ok(Ok(output)) => output,
    Ok(Err(e)) => {
      error!(err = %e, "Failed to read Claude CLI output");
      return Err(e.into());
    }
    Err(_) => {
      warn!(
        timeout_secs = request.timeout_secs,
        elapsed_ms = start.elapsed().as_millis() as u64,
        model = %request.model,
        "Claude CLI timed out"
      );
      if let Err(e) = child.kill().await {
        debug!(err = %e, "Failed to kill timed out Claude CLI process");
      }
      return Err(LlmError::Timeout(request.timeout_secs));
    }
  };

  let status = child.wait().await?;
  if !status.success() {
    let exit_code = status.code().unwrap_or(-1);
    error!(exit_code, model = %request.model, "Claude CLI process failed");
    return Err(LlmError::ProcessFailed(exit_code));
  }

  let response = parse_output(&output)?;

  debug!(
    response_len = response.text.len(),
    input_tokens = response.input_tokens,
    output_tokens = response.output_tokens,
    duration_ms = response.duration_ms,
    cost_usd = ?response.cost_usd,
    elapsed_ms = start.elapsed().as_millis() as u64,
    model = %request.model,
    "Inference completed successfully"
  );

  Ok(response)
}

/// Parse the JSON array printed by `claude -p --output-format json`
fn parse_output(output: &str) -> Result<InferenceResponse> {
  let messages: Vec<ClaudeMessage> = serde_json::from_str(output).map_err(|e| {
    warn!(
      err = %e,
      output_len = output.len(),
      output_preview = %output.chars().take(200).collect::<String>(),
      "Failed to parse Claude CLI JSON response"
    );
    LlmError::ParseError(e)
  })?;

  let mut text = String::new();
  let mut response = InferenceResponse {
    text: String::new(),
    input_tokens: 0,
    output_tokens: 0,
    cost_usd: None,
    duration_ms: 0,
  };

  for msg in messages {
    match msg {
      ClaudeMessage::User {} | ClaudeMessage::System {} => {}
      ClaudeMessage::Assistant(assistant) => {
        for block in assistant.message.content {
          if let ContentBlock::Text { text: chunk } = block {
            text.push_str(&chunk);
          }
        }
      }
      ClaudeMessage::Result(result) => {
        if result.is_error {
          let error_msg = result.result.unwrap_or_else(|| "Unknown error".to_string());
          error!(error_msg = %error_msg, "Claude returned an error");
          return Err(LlmError::ClaudeError(error_msg));
        }

        response.duration_ms = result.duration_ms;
        response.cost_usd = Some(result.total_cost_usd);

        if let Some(usage) = result.usage {
          response.input_tokens = usage.input_tokens;
          response.output_tokens = usage.output_tokens;
        }

        // Fall back to the result summary when no assistant block was printed
        if text.is_empty()
          && let Some(summary) = result.result
        {
          text = summary;
        }
      }
    }
  }

  response.text = text;

  if response.text.is_empty() {
    return Err(LlmError::NoResponse);
  }

  Ok(response)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_assistant_text() {
    let output = r#"[
      {"type":"system"},
      {"type":"assistant","message":{"content":[{"type":"text","text":"Hello, "},{"type":"tool_use"},{"type":"text","text":"world."}]}},
      {"type":"result","is_error":false,"duration_ms":1200,"total_cost_usd":0.01,"usage":{"input_tokens":10,"output_tokens":4},"result":"Hello, world."}
    ]"#;

    let response = parse_output(output).unwrap();
    assert_eq!(response.text, "Hello, world.");
    assert_eq!(response.input_tokens, 10);
    assert_eq!(response.output_tokens, 4);
    assert_eq!(response.duration_ms, 1200);
    assert_eq!(response.cost_usd, Some(0.01));
  }

  #[test]
  fn test_parse_result_only() {
    let output = r#"[{"type":"result","result":"Just the result"}]"#;
    let response = parse_output(output).unwrap();
    assert_eq!(response.text, "Just the result");
  }

  #[test]
  fn test_parse_error_result() {
    let output = r#"[{"type":"result","is_error":true,"result":"rate limited"}]"#;
    let err = parse_output(output).unwrap_err();
    assert!(matches!(err, LlmError::ClaudeError(msg) if msg == "rate limited"));
  }

  #[test]
  fn test_parse_empty_response() {
    let output = r#"[{"type":"system"},{"type":"result","is_error":false}]"#;
    assert!(matches!(parse_output(output), Err(LlmError::NoResponse)));
  }

  #[test]
  fn test_parse_invalid_json() {
    assert!(matches!(parse_output("not json"), Err(LlmError::ParseError(_))));
  }

  #[test]
  fn test_command_runs_print_mode_without_tools() {
    let cmd = build_command("claude", &InferenceRequest::new("x").with_model("haiku"));
    let args: Vec<String> = cmd
      .as_std()
      .get_args()
      .map(|a| a.to_string_lossy().into_owned())
      .collect();
    assert_eq!(args[0], "-p");
    assert!(args.windows(2).any(|w| w[0] == "--model" && w[1] == "haiku"));
    assert!(args.windows(2).any(|w| w[0] == "--tools" && w[1].is_empty()));
  }

  // Requires the `claude` CLI to be available
  #[tokio::test]
  #[ignore = "requires claude CLI"]
  async fn test_claude_provider_infer() {
    let provider = ClaudeProvider::new();
    assert!(provider.is_available());
    assert_eq!(provider.name(), "claude-cli");

    let request = InferenceRequest::new("Say 'hello' and nothing else")
      .with_model("haiku")
      .with_timeout(30);

    let response = provider.infer(request).await.unwrap();
    assert!(response.text.to_lowercase().contains("hello"));
    assert!(response.output_tokens > 0);
  }
}
