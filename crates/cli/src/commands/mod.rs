//! CLI command implementations

mod config;
mod prompt;
mod queue;
mod status;
mod submit;
mod worker;

pub use config::{cmd_config_init, cmd_config_show};
pub use prompt::{cmd_prompt_reset, cmd_prompt_set, cmd_prompt_show};
pub use queue::{cmd_queue_claim, cmd_queue_complete, cmd_queue_depth, cmd_queue_wait};
pub use status::cmd_status;
pub use submit::cmd_submit;
pub use worker::{cmd_stop, cmd_worker};

use anyhow::{Context, Result};
use quill::{config::Config, queue::QueueLayout};
use tokio::io::AsyncReadExt;

/// Use `arg` if given, otherwise read all of stdin
async fn text_or_stdin(arg: Option<String>) -> Result<String> {
  if let Some(text) = arg {
    return Ok(text);
  }

  let mut text = String::new();
  tokio::io::stdin()
    .read_to_string(&mut text)
    .await
    .context("Failed to read stdin")?;
  Ok(text)
}

/// Queue layout for the configured state root, created if missing
async fn layout(config: &Config) -> Result<QueueLayout> {
  let layout = QueueLayout::new(config.state_root());
  layout
    .ensure()
    .await
    .with_context(|| format!("Failed to create queue directories in {:?}", layout.root()))?;
  Ok(layout)
}
