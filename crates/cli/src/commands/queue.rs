//! Worker-side queue commands
//!
//! These let an external agent drive the queue step by step: wait for a
//! request, claim it, transform it however it likes and complete it.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result, bail};
use quill::{
  config::Config,
  prompt::{self, PromptStore},
  request::RequestId,
  worker::{Identity, Worker},
};
use serde_json::json;

use super::{layout, text_or_stdin};

/// Worker used for manual stepping; its transformer is never invoked
fn manual_worker(config: &Config) -> Worker {
  Worker::from_config(config, Arc::new(Identity))
}

pub async fn cmd_queue_depth(config: &Config) -> Result<()> {
  layout(config).await?;
  let depth = manual_worker(config).check_queue_depth().await?;
  println!("{}", depth);
  Ok(())
}

/// Claim the oldest request and print `{id, payload[, prompt]}`, or `null`
pub async fn cmd_queue_claim(config: &Config, with_prompt: bool) -> Result<()> {
  let layout = layout(config).await?;
  let mut worker = manual_worker(config);

  let Some(claim) = worker.claim_next().await.context("Failed to claim request")? else {
    println!("null");
    return Ok(());
  };

  let mut out = json!({
    "id": claim.id,
    "payload": claim.payload,
  });
  if with_prompt {
    let template = PromptStore::for_layout(&layout).load().await;
    out["prompt"] = json!(prompt::combine(&template, &claim.payload));
  }

  println!("{}", serde_json::to_string_pretty(&out)?);
  Ok(())
}

/// Write the response for a claimed request and print the response name
pub async fn cmd_queue_complete(config: &Config, id: &str, text: Option<String>) -> Result<()> {
  layout(config).await?;
  let text = text_or_stdin(text).await?;
  if text.trim().is_empty() {
    bail!("Response text is empty");
  }

  let name = manual_worker(config)
    .complete_claim(&RequestId::new(id), &text)
    .await
    .with_context(|| format!("Failed to complete {}", id))?;
  println!("{}", name);
  Ok(())
}

/// Print `true` once a request is waiting, `false` on timeout
pub async fn cmd_queue_wait(config: &Config, timeout: u64) -> Result<()> {
  layout(config).await?;
  let arrived = manual_worker(config)
    .wait_for_arrival(Duration::from_secs(timeout))
    .await?;
  println!("{}", arrived);
  Ok(())
}
