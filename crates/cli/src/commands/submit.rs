//! Submit command

use std::time::Duration;

use anyhow::{Context, Result, bail};
use quill::{
  config::Config,
  queue::QueueLayout,
  running_worker_pid,
  submit::{SubmitError, Submitter},
};
use tracing::debug;

use super::text_or_stdin;

/// Submit text and print the worker's response.
///
/// Exits with status 1 when no text is given, on timeout, or when the
/// worker answered with an `Error:` response.
pub async fn cmd_submit(config: &Config, text: Option<String>, timeout: Option<u64>) -> Result<()> {
  let text = text_or_stdin(text).await?;
  if text.trim().is_empty() {
    // Reported on stderr as `Error: No text provided` with exit status 1
    bail!("No text provided");
  }

  let timeout = timeout.map(Duration::from_secs).unwrap_or_else(|| config.submit.timeout());
  let submitter = Submitter::from_config(config);
  let pending = submitter.enqueue(&text).await.context("Failed to queue request")?;
  debug!(request_id = %pending.id, path = ?pending.path(), "Waiting for response");

  let result = tokio::select! {
    result = submitter.wait(&pending, timeout) => result,
    _ = tokio::signal::ctrl_c() => {
      if submitter.withdraw(&pending).await {
        eprintln!("Cancelled, request withdrawn");
      } else {
        eprintln!("Cancelled, but the worker already claimed the request; its response will stay in the outbox");
      }
      std::process::exit(1);
    }
  };

  match result {
    Ok(response) => {
      print!("{}", response);
      if !response.ends_with('\n') {
        println!();
      }
      if response.starts_with("Error:") {
        std::process::exit(1);
      }
      Ok(())
    }
    Err(SubmitError::Timeout(waited)) => {
      submitter.withdraw(&pending).await;
      let layout = QueueLayout::new(config.state_root());
      if running_worker_pid(&layout).is_none() {
        bail!(
          "No response after {}s and no worker is running (start one with `quill worker --detach`)",
          waited.as_secs()
        );
      }
      bail!("No response after {}s", waited.as_secs());
    }
    Err(e) => Err(e).context("Failed to collect response"),
  }
}
