//! Quill CLI - filesystem text queue with an LLM worker

use anyhow::Result;
use clap::{Parser, Subcommand};
use quill::config::{Config, TransformKind};

mod commands;
mod logging;

use commands::{
  cmd_config_init, cmd_config_show, cmd_prompt_reset, cmd_prompt_set, cmd_prompt_show, cmd_queue_claim,
  cmd_queue_complete, cmd_queue_depth, cmd_queue_wait, cmd_status, cmd_stop, cmd_submit, cmd_worker,
};
use logging::{init_cli_logging, init_worker_logging};

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Filesystem-mediated text transformation queue")]
#[command(after_help = "\
QUICK START:
  quill worker --detach           # Start a background worker
  echo 'helo wrold' | quill submit  # Submit text, print the result
  quill status                    # Show queue state

STATE ROOT:
  $QUILL_HOME, else $XDG_DATA_HOME/quill, else the platform data dir
  (override with [queue] root in config.toml)")]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

/// Subcommands for `quill queue`
#[derive(Subcommand)]
pub enum QueueCommand {
  /// Count requests waiting in the inbox
  Depth,
  /// Claim the oldest request and print it as JSON
  Claim {
    /// Include the prompt template combined with the payload
    #[arg(long)]
    with_prompt: bool,
  },
  /// Write the response for a claimed request
  Complete {
    /// Request id printed by `queue claim`
    id: String,
    /// Response text (default: read from stdin)
    text: Option<String>,
  },
  /// Block until a request arrives
  Wait {
    /// Seconds to wait
    #[arg(short, long, default_value = "30")]
    timeout: u64,
  },
}

/// Subcommands for `quill prompt`
#[derive(Subcommand)]
pub enum PromptCommand {
  /// Print the prompt template
  Show,
  /// Replace the prompt template
  Set {
    /// New prompt (default: read from stdin)
    text: Option<String>,
  },
  /// Restore the default prompt template
  Reset,
}

/// Subcommands for `quill config`
#[derive(Subcommand)]
pub enum ConfigCommand {
  /// Show effective configuration
  Show,
  /// Write a commented default config file
  Init {
    /// Overwrite an existing file
    #[arg(long)]
    force: bool,
  },
}

#[derive(Subcommand)]
enum Commands {
  /// Submit text from stdin (or an argument) and print the transformed result
  Submit {
    /// Text to submit (default: read from stdin)
    text: Option<String>,
    /// Seconds to wait for a response (default: [submit] timeout_secs)
    #[arg(short, long)]
    timeout: Option<u64>,
  },
  /// Run the worker loop
  Worker {
    /// Start a detached worker and return
    #[arg(long, conflicts_with = "background")]
    detach: bool,
    /// Run as the detached child (file logging)
    #[arg(long, hide = true)]
    background: bool,
    /// Transformer to apply (default: [worker] transform)
    #[arg(long)]
    transform: Option<TransformKind>,
  },
  /// Stop the running worker
  Stop,
  /// Worker-side queue operations
  Queue {
    #[command(subcommand)]
    command: QueueCommand,
  },
  /// Show queue status as JSON
  Status,
  /// Manage the prompt template
  Prompt {
    #[command(subcommand)]
    command: PromptCommand,
  },
  /// Manage configuration
  #[command(after_help = "\
CONFIG LOCATION:
  $QUILL_CONFIG_DIR/config.toml, else ~/.config/quill/config.toml")]
  Config {
    #[command(subcommand)]
    command: ConfigCommand,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  let config = Config::load();

  // File logging for the background worker, console for everything else
  let _guard = match &cli.command {
    Commands::Worker { background, detach, .. } if !detach => {
      init_worker_logging(&config.daemon, &config.state_root(), *background)
    }
    _ => {
      init_cli_logging();
      None
    }
  };

  match cli.command {
    Commands::Submit { text, timeout } => cmd_submit(&config, text, timeout).await,
    Commands::Worker {
      detach,
      background: _,
      transform,
    } => cmd_worker(config, detach, transform).await,
    Commands::Stop => cmd_stop(&config).await,

    Commands::Queue { command } => match command {
      QueueCommand::Depth => cmd_queue_depth(&config).await,
      QueueCommand::Claim { with_prompt } => cmd_queue_claim(&config, with_prompt).await,
      QueueCommand::Complete { id, text } => cmd_queue_complete(&config, &id, text).await,
      QueueCommand::Wait { timeout } => cmd_queue_wait(&config, timeout).await,
    },

    Commands::Status => cmd_status(&config).await,

    Commands::Prompt { command } => match command {
      PromptCommand::Show => cmd_prompt_show(&config).await,
      PromptCommand::Set { text } => cmd_prompt_set(&config, text).await,
      PromptCommand::Reset => cmd_prompt_reset(&config).await,
    },

    Commands::Config { command } => match command {
      ConfigCommand::Show => cmd_config_show(&config).await,
      ConfigCommand::Init { force } => cmd_config_init(force).await,
    },
  }
}
