//! Database connection management for LanceDB

use anyhow::{Context, Result};
use lancedb::{connect, Connection};
use std::path::Path;

/// Connect to the LanceDB directory at `data_dir`, creating it if needed
pub async fn create_connection(data_dir: &Path) -> Result<Connection> {
  ensure_data_directory_exists(data_dir)?;

  connect(&data_dir.to_string_lossy())
    .execute()
    .await
    .with_context(|| format!("Failed to connect to LanceDB at {}", data_dir.display()))
}

fn ensure_data_directory_exists(data_dir: &Path) -> Result<()> {
  if !data_dir.exists() {
    std::fs::create_dir_all(data_dir)
      .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
  }
  Ok(())
}
