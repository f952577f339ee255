//! Long-running worker process lifecycle.
//!
//! `quill worker` runs [`Daemon::run`] in the foreground; `quill worker
//! --background` re-executes the binary detached (see
//! [`Daemon::spawn_detached`]) and the child runs the same loop with its logs
//! going to a rolling file in the state root.
//!
//! # Lifecycle
//!
//! 1. Ensure queue directories and the default prompt
//! 2. Refuse to start if another live worker owns the pid file
//! 3. Build the transformer, write the pid file, prune old logs
//! 4. Run the worker until ctrl-c / SIGTERM
//! 5. Let the in-flight request finish, remove the pid file

use std::path::{Path, PathBuf};

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
  domain::config::{Config, TransformKind},
  prompt::PromptStore,
  queue::{Correlator, QueueError, QueueLayout, QueueStore},
  worker::{TransformError, Worker, WorkerHandle, transform},
};

/// Base name of the background worker's log files
pub const LOG_FILE_NAME: &str = "quill.log";

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
  #[error("Worker already running (pid {0})")]
  AlreadyRunning(u32),
  #[error("{0}")]
  Queue(#[from] QueueError),
  #[error("{0}")]
  Transform(#[from] TransformError),
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("Not supported on this platform: {0}")]
  Unsupported(&'static str),
}

// ============================================================================
// Configuration
// ============================================================================

/// Worker runtime configuration: the loaded config plus CLI overrides
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
  /// Directory holding inbox/, claimed/, outbox/, prompt and logs
  pub state_root: PathBuf,
  /// Transformer to run (config value unless overridden)
  pub transform: TransformKind,
  pub config: Config,
}

impl RuntimeConfig {
  pub async fn load() -> Self {
    // Auto-create user config on first run if it doesn't exist
    Self::ensure_user_config().await;
    Self::from_config(Config::load())
  }

  pub fn from_config(config: Config) -> Self {
    Self {
      state_root: config.state_root(),
      transform: config.worker.transform,
      config,
    }
  }

  pub fn with_transform(mut self, transform: Option<TransformKind>) -> Self {
    if let Some(transform) = transform {
      self.transform = transform;
    }
    self
  }

  async fn ensure_user_config() {
    let path = Config::user_config_path();
    if path.exists() {
      return;
    }

    if let Some(parent) = path.parent()
      && let Err(e) = tokio::fs::create_dir_all(parent).await
    {
      warn!("Failed to create config directory: {}", e);
      return;
    }

    match tokio::fs::write(&path, Config::generate_template()).await {
      Ok(()) => info!("Created user config: {:?}", path),
      Err(e) => warn!("Failed to create user config: {}", e),
    }
  }
}

// ============================================================================
// Daemon
// ============================================================================

pub struct Daemon {
  runtime_config: RuntimeConfig,
}

impl Daemon {
  pub fn new(runtime_config: RuntimeConfig) -> Self {
    Self { runtime_config }
  }

  /// Spawn a detached worker process using the current executable.
  ///
  /// Re-executes the binary with `worker --background` so the child gets a
  /// fresh Tokio runtime. Returns the child PID.
  pub fn spawn_detached(transform: Option<TransformKind>) -> std::io::Result<u32> {
    use std::process::{Command, Stdio};

    let exe = std::env::current_exe()?;

    let mut cmd = Command::new(&exe);
    cmd.arg("worker").arg("--background");
    if let Some(transform) = transform {
      cmd.arg("--transform").arg(transform.as_str());
    }

    let child = cmd
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .spawn()?;

    let pid = child.id();
    info!("Spawned worker process with PID {}", pid);
    Ok(pid)
  }

  /// Run the worker until ctrl-c or SIGTERM
  pub async fn run(self) -> Result<(), DaemonError> {
    let RuntimeConfig {
      state_root,
      transform: kind,
      config,
    } = self.runtime_config;

    info!("Starting quill worker");
    info!("State root: {:?}", state_root);

    let layout = QueueLayout::new(&state_root);
    layout.ensure().await?;

    if let Some(pid) = running_worker_pid(&layout)
      && pid != std::process::id()
    {
      return Err(DaemonError::AlreadyRunning(pid));
    }

    PromptStore::for_layout(&layout).ensure_default().await?;
    let transformer = transform::from_config(kind, &config, layout.prompt_file())?;

    tokio::fs::write(layout.pid_file(), std::process::id().to_string()).await?;

    if config.daemon.log_retention_days > 0 {
      let deleted = cleanup_old_logs(layout.root(), config.daemon.log_retention_days);
      if deleted > 0 {
        info!("Cleaned up {} old log files at startup", deleted);
      }
    }

    let worker = Worker::new(
      QueueStore::new(layout.clone()),
      Correlator::new(config.queue.response_naming),
      transformer,
    )
    .with_intervals(config.worker.idle_interval(), config.worker.error_backoff())
    .with_arrival_poll(config.submit.poll_interval());

    // Master cancellation token - the worker gets a child
    let cancel = CancellationToken::new();

    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
      tokio::select! {
        _ = shutdown_signal() => {
          info!("Received shutdown signal, stopping worker...");
          cancel_for_signal.cancel();
        }
        _ = cancel_for_signal.cancelled() => {}
      }
    });

    let mut handle = WorkerHandle::spawn_with(worker, cancel.child_token());
    cancel.cancelled().await;

    info!("Shutting down...");
    let processed = handle.stop().await.map(|w| w.processed().len()).unwrap_or_default();

    if let Err(e) = tokio::fs::remove_file(layout.pid_file()).await {
      debug!("Failed to remove pid file: {}", e);
    }

    info!(processed, "Worker shutdown complete");
    Ok(())
  }

  /// Ask the worker owning `layout` to stop.
  ///
  /// Returns the signalled PID, or `None` if no live worker was found.
  pub fn signal_stop(layout: &QueueLayout) -> Result<Option<u32>, DaemonError> {
    let Some(pid) = running_worker_pid(layout) else {
      return Ok(None);
    };
    send_terminate(pid)?;
    info!("Sent stop signal to worker {}", pid);
    Ok(Some(pid))
  }
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = signal::ctrl_c().await {
      warn!("Failed to listen for ctrl-c: {}", e);
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut term) => {
        term.recv().await;
      }
      Err(e) => {
        warn!("Failed to listen for SIGTERM: {}", e);
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {}
    _ = terminate => {}
  }
}

// ============================================================================
// PID file
// ============================================================================

/// PID recorded in the pid file, if any
pub fn read_pid(layout: &QueueLayout) -> Option<u32> {
  std::fs::read_to_string(layout.pid_file())
    .ok()
    .and_then(|s| s.trim().parse().ok())
}

/// PID of a live worker for this state root
pub fn running_worker_pid(layout: &QueueLayout) -> Option<u32> {
  read_pid(layout).filter(|pid| is_process_alive(*pid))
}

#[cfg(unix)]
fn is_process_alive(pid: u32) -> bool {
  let Ok(pid) = libc::pid_t::try_from(pid) else {
    return false;
  };
  // SAFETY: signal 0 only checks existence and permissions
  let rc = unsafe { libc::kill(pid, 0) };
  rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
  true
}

#[cfg(unix)]
fn send_terminate(pid: u32) -> Result<(), DaemonError> {
  let pid = libc::pid_t::try_from(pid).map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidInput))?;
  // SAFETY: plain kill(2) on a pid read from our own pid file
  if unsafe { libc::kill(pid, libc::SIGTERM) } != 0 {
    return Err(std::io::Error::last_os_error().into());
  }
  Ok(())
}

#[cfg(not(unix))]
fn send_terminate(_pid: u32) -> Result<(), DaemonError> {
  Err(DaemonError::Unsupported("stopping a background worker"))
}

// ============================================================================
// Log retention
// ============================================================================

/// Delete worker log files in `dir` older than `retention_days`
pub fn cleanup_old_logs(dir: &Path, retention_days: u64) -> usize {
  use std::time::SystemTime;

  let retention_secs = retention_days * 24 * 3600;
  let now = SystemTime::now();
  let mut deleted = 0;

  let entries = match std::fs::read_dir(dir) {
    Ok(e) => e,
    Err(e) => {
      warn!("Failed to read log directory {:?}: {}", dir, e);
      return 0;
    }
  };

  for entry in entries.flatten() {
    let path = entry.path();
    if path.is_dir() {
      continue;
    }

    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
      continue;
    };
    if !file_name.starts_with(LOG_FILE_NAME) {
      continue;
    }

    let Some(age) = entry
      .metadata()
      .and_then(|m| m.modified())
      .ok()
      .and_then(|modified| now.duration_since(modified).ok())
    else {
      continue;
    };

    if age.as_secs() > retention_secs {
      if let Err(e) = std::fs::remove_file(&path) {
        warn!("Failed to delete old log file {:?}: {}", path, e);
      } else {
        debug!("Deleted old log file: {:?}", path);
        deleted += 1;
      }
    }
  }

  deleted
}
