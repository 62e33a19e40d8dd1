//! CLI command implementations
//!
//! Each command builds the same [`AppState`] the server uses, runs a single
//! operation and prints the result as JSON.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

use crate::config::KindredConfig;
use crate::error::MatchError;
use crate::ingest::{ImportDocument, JournalEntry};
use crate::lifecycle;
use crate::models::UserId;
use crate::server::state::AppState;

/// Create every missing LanceDB table
#[cfg(feature = "lancedb-store")]
pub async fn provision(config: &KindredConfig) -> Result<()> {
  use crate::services::lancedb::LanceDbStore;

  let created =
    LanceDbStore::provision(&config.storage.data_dir, config.storage.embedding_dimension).await?;
  if created.is_empty() {
    println!("All tables already exist in {}", config.storage.data_dir.display());
  } else {
    println!("Created tables in {}: {}", config.storage.data_dir.display(), created.join(", "));
  }
  Ok(())
}

#[cfg(not(feature = "lancedb-store"))]
pub async fn provision(_config: &KindredConfig) -> Result<()> {
  anyhow::bail!("kindred was built without the lancedb-store feature; nothing to provision")
}

pub async fn find_matches(
  config: &KindredConfig,
  user_id: UserId,
  k: Option<usize>,
  threshold: Option<f32>,
) -> Result<()> {
  let state = AppState::from_config(config).await?;
  let k = k.unwrap_or(config.matching.group_k);
  let threshold = threshold.unwrap_or(config.matching.group_threshold);

  let candidates = state.matcher.find_nearest(user_id, k, threshold).await?;
  if candidates.is_empty() {
    println!("No users within {threshold} of user {user_id}");
    return Ok(());
  }
  print_json(&candidates)
}

pub async fn pair(config: &KindredConfig, user_id: UserId) -> Result<()> {
  let state = AppState::from_config(config).await?;
  match state.matcher.propose_pair(user_id).await {
    Ok(connection) => print_json(&connection),
    Err(e) if e.is_expected() => {
      println!("{e}");
      Ok(())
    }
    Err(e) => Err(e.into()),
  }
}

pub async fn group(config: &KindredConfig, user_id: UserId) -> Result<()> {
  let state = AppState::from_config(config).await?;
  match state.matcher.propose_group(user_id).await {
    Ok(connection) => print_json(&connection),
    Err(e @ MatchError::InsufficientCandidates { .. }) => {
      println!("{e}");
      Ok(())
    }
    Err(e) => Err(e.into()),
  }
}

pub async fn accept(config: &KindredConfig, id: Uuid) -> Result<()> {
  let state = AppState::from_config(config).await?;
  let connection = lifecycle::accept(state.connections.as_ref(), id).await?;
  print_json(&connection)
}

/// Load users and journal entries from a YAML file
pub async fn import(config: &KindredConfig, path: &Path) -> Result<()> {
  let document = ImportDocument::load(path)?;
  let state = AppState::from_config(config).await?;
  let report = state.ingest.import(document).await?;

  println!(
    "Imported {} users and {} journal entries ({} summarized)",
    report.users, report.entries, report.summarized
  );
  Ok(())
}

/// Summarize and store a single raw journal entry
pub async fn journal(
  config: &KindredConfig,
  user_id: UserId,
  content: String,
  consent: bool,
) -> Result<()> {
  let state = AppState::from_config(config).await?;
  let entry =
    JournalEntry { user_id, content: Some(content), summary: None, entry_date: Utc::now(), consent };
  let stored = state.ingest.add_entry(entry).await?;
  print_json(&stored)
}

pub async fn summarize(config: &KindredConfig, user_id: UserId) -> Result<()> {
  let state = AppState::from_config(config).await?;
  let generated = state.pipeline.refresh(user_id).await?;

  println!("{}", generated.insight.text);
  if !generated.keywords.is_empty() {
    println!("\nKeywords: {}", generated.keywords.join(", "));
  }
  println!("\n({} journal entries used)", generated.entries_used);
  Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value).context("Failed to render output")?);
  Ok(())
}
