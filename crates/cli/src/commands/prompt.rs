//! Prompt template commands

use anyhow::{Context, Result, bail};
use quill::{config::Config, prompt::PromptStore};

use super::{layout, text_or_stdin};

async fn store(config: &Config) -> Result<PromptStore> {
  Ok(PromptStore::for_layout(&layout(config).await?))
}

pub async fn cmd_prompt_show(config: &Config) -> Result<()> {
  let store = store(config).await?;
  store.ensure_default().await?;
  let prompt = store.read().await.context("Failed to read prompt")?;
  println!("# {}", store.path().display());
  print!("{}", prompt);
  Ok(())
}

pub async fn cmd_prompt_set(config: &Config, text: Option<String>) -> Result<()> {
  let text = text_or_stdin(text).await?;
  if text.trim().is_empty() {
    bail!("Prompt is empty");
  }

  let store = store(config).await?;
  store.update(&text).await.context("Failed to update prompt")?;
  println!("Updated prompt: {:?}", store.path());
  Ok(())
}

pub async fn cmd_prompt_reset(config: &Config) -> Result<()> {
  let store = store(config).await?;
  store.reset().await.context("Failed to reset prompt")?;
  println!("Reset prompt to default: {:?}", store.path());
  Ok(())
}
