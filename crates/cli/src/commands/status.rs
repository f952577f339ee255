//! Status command

use anyhow::Result;
use quill::{config::Config, status::QueueStatus};

use super::layout;

pub async fn cmd_status(config: &Config) -> Result<()> {
  let layout = layout(config).await?;
  let status = QueueStatus::collect(&layout, config.queue.response_naming).await?;
  println!("{}", serde_json::to_string_pretty(&status)?);
  Ok(())
}
