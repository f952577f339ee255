use std::path::PathBuf;

/// Get the default state root (inbox, outbox, prompt, logs)
///
/// Respects the following environment variables (in order of precedence):
/// 1. QUILL_HOME - explicit state directory override
/// 2. XDG_DATA_HOME - standard XDG data home directory
/// 3. dirs::data_local_dir() - platform default
pub fn default_state_root() -> PathBuf {
  // Check explicit override first
  if let Ok(dir) = std::env::var("QUILL_HOME") {
    return PathBuf::from(dir);
  }

  // Check XDG_DATA_HOME
  if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
    return PathBuf::from(xdg_data).join("quill");
  }

  // Fall back to platform default
  dirs::data_local_dir()
    .unwrap_or_else(|| PathBuf::from("."))
    .join("quill")
}

/// Get the default config directory
///
/// Respects the following environment variables (in order of precedence):
/// 1. QUILL_CONFIG_DIR - explicit config directory override
/// 2. XDG_CONFIG_HOME - standard XDG config home directory
/// 3. dirs::config_dir() - platform default
pub fn default_config_dir() -> PathBuf {
  if let Ok(dir) = std::env::var("QUILL_CONFIG_DIR") {
    return PathBuf::from(dir);
  }

  if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
    return PathBuf::from(xdg_config).join("quill");
  }

  dirs::config_dir()
    .unwrap_or_else(|| PathBuf::from("."))
    .join("quill")
}
