//! Configuration for the Quill queue, submitter and worker.
//!
//! Config location: $QUILL_CONFIG_DIR/config.toml > $XDG_CONFIG_HOME/quill/config.toml > platform config dir

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Floor for polling intervals, a zero interval would spin
const MIN_POLL_INTERVAL_MS: u64 = 10;

// ============================================================================
// Queue Configuration
// ============================================================================

/// How a response file is named relative to its request.
///
/// Both sides of the queue read the same configuration, so only one strategy
/// is ever in force for a given state root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseNaming {
  /// Response name is identical to the request name, in the outbox
  #[default]
  Exact,
  /// Response name is `<request-id>_<processed-unix-secs>.txt`
  Suffixed,
}

impl ResponseNaming {
  pub fn as_str(&self) -> &'static str {
    match self {
      ResponseNaming::Exact => "exact",
      ResponseNaming::Suffixed => "suffixed",
    }
  }
}

impl std::str::FromStr for ResponseNaming {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "exact" => Ok(ResponseNaming::Exact),
      "suffixed" => Ok(ResponseNaming::Suffixed),
      other => Err(format!("unknown response naming: {}", other)),
    }
  }
}

/// Queue layout configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QueueConfig {
  /// State root override (default: platform data dir, see `dirs::default_state_root`)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub root: Option<PathBuf>,

  /// Response naming strategy shared by submitter and worker
  pub response_naming: ResponseNaming,
}

// ============================================================================
// Submit Configuration
// ============================================================================

/// Caller-side settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitConfig {
  /// Seconds to wait for a response before giving up
  /// Default: 30
  pub timeout_secs: u64,

  /// Outbox poll interval in milliseconds
  /// Default: 500
  pub poll_interval_ms: u64,
}

impl Default for SubmitConfig {
  fn default() -> Self {
    Self {
      timeout_secs: 30,
      poll_interval_ms: 500,
    }
  }
}

impl SubmitConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }

  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
  }
}

// ============================================================================
// Worker Configuration
// ============================================================================

/// Which transformer the worker applies to request payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
  /// Prompt template + payload sent to the Claude CLI
  #[default]
  Claude,
  /// Payload returned unchanged
  Identity,
  /// Payload upper-cased
  Uppercase,
}

impl TransformKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      TransformKind::Claude => "claude",
      TransformKind::Identity => "identity",
      TransformKind::Uppercase => "uppercase",
    }
  }
}

impl std::str::FromStr for TransformKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "claude" => Ok(TransformKind::Claude),
      "identity" => Ok(TransformKind::Identity),
      "uppercase" => Ok(TransformKind::Uppercase),
      other => Err(format!("unknown transform: {}", other)),
    }
  }
}

/// Processor-side settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
  /// Sleep between scans when the inbox is empty (ms)
  /// Default: 1000
  pub idle_interval_ms: u64,

  /// Sleep after a failed cycle (ms)
  /// Default: 5000
  pub error_backoff_ms: u64,

  /// Transformer applied to each request
  pub transform: TransformKind,
}

impl Default for WorkerConfig {
  fn default() -> Self {
    Self {
      idle_interval_ms: 1000,
      error_backoff_ms: 5000,
      transform: TransformKind::default(),
    }
  }
}

impl WorkerConfig {
  pub fn idle_interval(&self) -> Duration {
    Duration::from_millis(self.idle_interval_ms.max(MIN_POLL_INTERVAL_MS))
  }

  pub fn error_backoff(&self) -> Duration {
    Duration::from_millis(self.error_backoff_ms.max(MIN_POLL_INTERVAL_MS))
  }
}

/// LLM transformer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
  /// Model passed to the Claude CLI
  pub model: String,

  /// Per-request inference timeout in seconds
  pub timeout_secs: u64,
}

impl Default for TransformConfig {
  fn default() -> Self {
    Self {
      model: "sonnet".to_string(),
      timeout_secs: 120,
    }
  }
}

// ============================================================================
// Daemon Configuration
// ============================================================================

/// Logging settings for the long-running worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
  /// Log level: "off", "error", "warn", "info", "debug", "trace"
  /// Default: "info"
  #[serde(default = "default_log_level")]
  pub log_level: String,

  /// Log file rotation: "daily", "hourly", "never"
  /// Default: "daily"
  #[serde(default = "default_log_rotation")]
  pub log_rotation: String,

  /// Maximum log file age in days (0 = keep forever)
  /// Default: 7
  #[serde(default = "default_log_retention_days")]
  pub log_retention_days: u64,
}

fn default_log_level() -> String {
  "info".to_string()
}
fn default_log_rotation() -> String {
  "daily".to_string()
}
fn default_log_retention_days() -> u64 {
  7
}

impl Default for DaemonConfig {
  fn default() -> Self {
    Self {
      log_level: default_log_level(),
      log_rotation: default_log_rotation(),
      log_retention_days: default_log_retention_days(),
    }
  }
}

// ============================================================================
// Top-level Config
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
  #[serde(default)]
  pub queue: QueueConfig,

  #[serde(default)]
  pub submit: SubmitConfig,

  #[serde(default)]
  pub worker: WorkerConfig,

  #[serde(default)]
  pub transform: TransformConfig,

  #[serde(default)]
  pub daemon: DaemonConfig,
}

impl Config {
  /// Load the user config, falling back to defaults when missing or invalid
  pub fn load() -> Self {
    Self::load_from(&Self::user_config_path())
  }

  /// Load config from an explicit path, falling back to defaults
  pub fn load_from(path: &Path) -> Self {
    if !path.exists() {
      debug!(path = %path.display(), "No config file, using defaults");
      return Self::default();
    }

    match std::fs::read_to_string(path) {
      Ok(content) => match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
          warn!(path = %path.display(), err = %e, "Invalid config file, using defaults");
          Self::default()
        }
      },
      Err(e) => {
        warn!(path = %path.display(), err = %e, "Failed to read config file, using defaults");
        Self::default()
      }
    }
  }

  /// Get the user-level config path
  pub fn user_config_path() -> PathBuf {
    crate::dirs::default_config_dir().join("config.toml")
  }

  /// Resolve the state root: explicit config wins over the environment default
  pub fn state_root(&self) -> PathBuf {
    self
      .queue
      .root
      .clone()
      .unwrap_or_else(crate::dirs::default_state_root)
  }

  /// Generate a default config file as a string
  pub fn generate_template() -> String {
    r#"# Quill Configuration
# Place in ~/.config/quill/config.toml (or $QUILL_CONFIG_DIR/config.toml)

# ============================================================================
# Queue
# ============================================================================

[queue]
# State root holding inbox/, outbox/, claimed/ and prompt.txt
# Defaults to $QUILL_HOME, then $XDG_DATA_HOME/quill, then the platform data dir
# root = "/home/me/.local/share/quill"

# Response naming, shared by submitter and worker:
#   exact    = response has the same file name as the request (recommended)
#   suffixed = response is <request-id>_<unix-secs>.txt
response_naming = "exact"

# ============================================================================
# Submitter
# ============================================================================

[submit]
# Seconds to wait for a response
timeout_secs = 30

# Outbox poll interval (milliseconds)
poll_interval_ms = 500

# ============================================================================
# Worker
# ============================================================================

[worker]
# Sleep between scans of an empty inbox (milliseconds)
idle_interval_ms = 1000

# Sleep after a failed cycle (milliseconds)
error_backoff_ms = 5000

# Transformer: claude, identity, or uppercase
transform = "claude"

[transform]
# Model passed to the claude CLI
model = "sonnet"

# Inference timeout (seconds)
timeout_secs = 120

# ============================================================================
# Logging
# ============================================================================

[daemon]
# Log level: off, error, warn, info, debug, trace
log_level = "info"

# Log rotation for the background worker: daily, hourly, never
log_rotation = "daily"

# Delete worker log files older than this many days (0 = keep forever)
log_retention_days = 7
"#
    .to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.queue.response_naming, ResponseNaming::Exact);
    assert!(config.queue.root.is_none());
    assert_eq!(config.submit.timeout_secs, 30);
    assert_eq!(config.submit.poll_interval(), Duration::from_millis(500));
    assert_eq!(config.worker.idle_interval(), Duration::from_secs(1));
    assert_eq!(config.worker.error_backoff(), Duration::from_secs(5));
    assert_eq!(config.worker.transform, TransformKind::Claude);
    assert_eq!(config.daemon.log_level, "info");
    assert_eq!(config.daemon.log_retention_days, 7);
  }

  #[test]
  fn test_template_parses_to_defaults() {
    let config: Config = toml::from_str(&Config::generate_template()).unwrap();
    assert_eq!(config.queue.response_naming, ResponseNaming::Exact);
    assert_eq!(config.submit.timeout_secs, 30);
    assert_eq!(config.worker.idle_interval_ms, 1000);
    assert_eq!(config.transform.model, "sonnet");
    assert_eq!(config.daemon.log_rotation, "daily");
  }

  #[test]
  fn test_partial_config() {
    let toml_content = r#"
[queue]
response_naming = "suffixed"

[worker]
transform = "uppercase"
"#;
    let config: Config = toml::from_str(toml_content).unwrap();
    assert_eq!(config.queue.response_naming, ResponseNaming::Suffixed);
    assert_eq!(config.worker.transform, TransformKind::Uppercase);
    // Untouched fields keep their defaults
    assert_eq!(config.worker.error_backoff_ms, 5000);
    assert_eq!(config.submit.poll_interval_ms, 500);
  }

  #[test]
  fn test_load_from_missing_file() {
    let temp = TempDir::new().unwrap();
    let config = Config::load_from(&temp.path().join("nope.toml"));
    assert_eq!(config.submit.timeout_secs, 30);
  }

  #[test]
  fn test_load_from_invalid_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "this is [not toml").unwrap();
    let config = Config::load_from(&path);
    assert_eq!(config.queue.response_naming, ResponseNaming::Exact);
  }

  #[test]
  fn test_state_root_override() {
    let temp = TempDir::new().unwrap();
    let config = Config {
      queue: QueueConfig {
        root: Some(temp.path().to_path_buf()),
        ..Default::default()
      },
      ..Default::default()
    };
    assert_eq!(config.state_root(), temp.path());
  }

  #[test]
  fn test_toml_roundtrip() {
    let config = Config {
      queue: QueueConfig {
        root: Some(PathBuf::from("/tmp/quill-test")),
        response_naming: ResponseNaming::Suffixed,
      },
      submit: SubmitConfig {
        timeout_secs: 5,
        poll_interval_ms: 100,
      },
      ..Default::default()
    };

    let toml_str = toml::to_string_pretty(&config).unwrap();
    let parsed: Config = toml::from_str(&toml_str).unwrap();

    assert_eq!(parsed.queue.root, Some(PathBuf::from("/tmp/quill-test")));
    assert_eq!(parsed.queue.response_naming, ResponseNaming::Suffixed);
    assert_eq!(parsed.submit.timeout_secs, 5);
    assert_eq!(parsed.submit.poll_interval_ms, 100);
  }

  #[test]
  fn test_parse_enums_from_str() {
    assert_eq!("EXACT".parse::<ResponseNaming>(), Ok(ResponseNaming::Exact));
    assert_eq!("identity".parse::<TransformKind>(), Ok(TransformKind::Identity));
    assert!("bogus".parse::<TransformKind>().is_err());
  }

  #[test]
  fn test_zero_intervals_are_clamped() {
    let config: Config = toml::from_str(
      r#"
[submit]
poll_interval_ms = 0

[worker]
idle_interval_ms = 0
error_backoff_ms = 0
"#,
    )
    .unwrap();
    assert_eq!(config.submit.poll_interval(), Duration::from_millis(10));
    assert_eq!(config.worker.idle_interval(), Duration::from_millis(10));
    assert_eq!(config.worker.error_backoff(), Duration::from_millis(10));
  }
}
