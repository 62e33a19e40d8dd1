use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};
use uuid::Uuid;

use kindred::commands;
use kindred::config::KindredConfig;
use kindred::models::UserId;
use kindred::server::startup::start_server;

#[derive(Parser)]
#[command(name = "kindred")]
#[command(about = "Kindred - pairs and groups journaling users by insight similarity")]
#[command(version)]
struct Cli {
  /// Path to a YAML config file (defaults to ~/.kindred/config.yaml if present)
  #[arg(long, global = true, env = "KINDRED_CONFIG")]
  config: Option<PathBuf>,

  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Run the REST API server
  Serve {
    /// Override the configured bind address
    #[arg(long)]
    bind: Option<SocketAddr>,
  },
  /// Create the LanceDB tables for the configured embedding dimension
  Provision,
  /// List the nearest users inside the distance threshold
  Match {
    user_id: UserId,
    /// Maximum number of candidates
    #[arg(short, long)]
    k: Option<usize>,
    /// Exclusive distance cutoff
    #[arg(short, long)]
    threshold: Option<f32>,
  },
  /// Suggest a pair connection with the nearest user
  Pair { user_id: UserId },
  /// Suggest a group connection with all nearby users
  Group { user_id: UserId },
  /// Accept a suggested connection
  Accept {
    /// Connection id
    id: Uuid,
  },
  /// Load users and journal entries from a YAML file
  Import { file: PathBuf },
  /// Summarize a raw journal entry and store it
  Journal {
    user_id: UserId,
    /// Raw entry text
    content: String,
    /// Store the entry without an AI summary
    #[arg(long)]
    no_consent: bool,
  },
  /// Generate a fresh insight from recent journal summaries
  Summarize { user_id: UserId },
}

fn init_logging(verbose: bool) {
  let default_filter = if verbose {
    "info,lance=warn,lance_datafusion=warn,datafusion=warn"
  } else {
    "kindred=info,lance=warn,lance_datafusion=error,datafusion=error,warn"
  };
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

  tracing_subscriber::registry().with(fmt::layer()).with(filter).init();
}

async fn handle(command: Command, mut config: KindredConfig) -> Result<()> {
  match command {
    Command::Serve { bind } => {
      if let Some(bind) = bind {
        config.server.bind = bind;
      }
      start_server(&config).await
    }
    Command::Provision => commands::provision(&config).await,
    Command::Match { user_id, k, threshold } => {
      commands::find_matches(&config, user_id, k, threshold).await
    }
    Command::Pair { user_id } => commands::pair(&config, user_id).await,
    Command::Group { user_id } => commands::group(&config, user_id).await,
    Command::Accept { id } => commands::accept(&config, id).await,
    Command::Import { file } => commands::import(&config, &file).await,
    Command::Journal { user_id, content, no_consent } => {
      commands::journal(&config, user_id, content, !no_consent).await
    }
    Command::Summarize { user_id } => commands::summarize(&config, user_id).await,
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let config = KindredConfig::load(cli.config.as_deref())?;
  handle(cli.command, config).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::CommandFactory;

  #[test]
  fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
  }

  #[test]
  fn test_accept_rejects_malformed_id_at_parse_time() {
    let error = Cli::try_parse_from(["kindred", "accept", "not-a-uuid"]).err().unwrap();
    assert_eq!(error.kind(), clap::error::ErrorKind::ValueValidation);

    let id = Uuid::new_v4();
    let cli = Cli::try_parse_from(["kindred", "accept", &id.to_string()]).unwrap();
    assert!(matches!(cli.command, Command::Accept { id: parsed } if parsed == id));
  }

  #[test]
  fn test_journal_consent_defaults_on() {
    let cli = Cli::try_parse_from(["kindred", "journal", "3", "A slow morning."]).unwrap();
    assert!(matches!(cli.command, Command::Journal { user_id: 3, no_consent: false, .. }));
  }
}
