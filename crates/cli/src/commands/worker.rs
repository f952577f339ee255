//! Worker start/stop commands

use std::time::Duration;

use anyhow::{Context, Result};
use quill::{
  Daemon, RuntimeConfig,
  config::{Config, TransformKind},
  queue::QueueLayout,
  running_worker_pid,
};
use tracing::warn;

/// Run the worker in this process, or start a detached one with `detach`
pub async fn cmd_worker(config: Config, detach: bool, transform: Option<TransformKind>) -> Result<()> {
  if detach {
    let layout = QueueLayout::new(config.state_root());
    if let Some(pid) = running_worker_pid(&layout) {
      println!("Worker already running (pid {})", pid);
      return Ok(());
    }

    let pid = Daemon::spawn_detached(transform).context("Failed to start background worker")?;
    println!("Started worker (pid {})", pid);
    println!("Logs: {:?}", layout.root());
    return Ok(());
  }

  let runtime = RuntimeConfig::load().await.with_transform(transform);
  Daemon::new(runtime).run().await.context("Worker failed")?;
  Ok(())
}

/// Stop the worker owning the configured state root
pub async fn cmd_stop(config: &Config) -> Result<()> {
  let layout = QueueLayout::new(config.state_root());

  let Some(pid) = Daemon::signal_stop(&layout).context("Failed to stop worker")? else {
    println!("Worker is not running");
    return Ok(());
  };

  // The worker finishes its in-flight request before exiting
  for _ in 0..100 {
    if running_worker_pid(&layout).is_none() {
      println!("Stopped worker (pid {})", pid);
      return Ok(());
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
  }

  warn!(pid, "Worker still shutting down after 10s");
  println!("Stop requested; worker (pid {}) is still finishing", pid);
  Ok(())
}
