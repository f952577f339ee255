//! Config commands

use anyhow::Result;
use quill::config::Config;
use tracing::error;

/// Print the effective configuration as TOML
pub async fn cmd_config_show(config: &Config) -> Result<()> {
  let user_config = Config::user_config_path();
  if user_config.exists() {
    println!("# Using user config: {:?}", user_config);
  } else {
    println!("# Using default configuration (no config file at {:?})", user_config);
  }
  println!("# State root: {:?}", config.state_root());
  println!();

  let toml_str = toml::to_string_pretty(config)?;
  println!("{}", toml_str);
  Ok(())
}

/// Write the commented default config to the user config path
pub async fn cmd_config_init(force: bool) -> Result<()> {
  let config_path = Config::user_config_path();

  if config_path.exists() && !force {
    error!("Config file already exists: {:?}", config_path);
    println!("Use --force to overwrite it");
    std::process::exit(1);
  }

  if let Some(parent) = config_path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(&config_path, Config::generate_template())?;

  println!("Created config: {:?}", config_path);
  println!("Edit the file to customize settings.");
  Ok(())
}
