//! LanceDB-backed implementation of the store traits
//!
//! Insights are written twice: once to the append-only `insight_history`
//! table and once to `latest_insights`, which holds exactly one row per user
//! and is what nearest-neighbor search runs over. Connections, users and
//! journal summaries each live in their own table.
//!
//! Tables are created by [`LanceDbStore::provision`] only. Opening the store
//! against a directory with missing tables, or with insight tables built for
//! another embedding dimension, fails.

pub mod connection;
pub mod records;
pub mod search;
pub mod table_manager;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Candidate, Connection, Insight, JournalSummary, NewConnection, User, UserId};
use crate::services::stores::{
  ConnectionStore, InsightStore, JournalSource, JournalWriter, UserDirectory,
};
use connection::create_connection;
use table_manager::{TableManager, CONNECTIONS, INSIGHT_HISTORY, JOURNALS, LATEST_INSIGHTS, USERS};

pub struct LanceDbStore {
  tables: TableManager,
  embedding_dimension: usize,
}

impl LanceDbStore {
  /// Open an already provisioned store
  pub async fn open(data_dir: &Path, embedding_dimension: usize) -> Result<Self> {
    let tables = TableManager::new(create_connection(data_dir).await?);

    let missing = tables.missing_tables(embedding_dimension).await?;
    if !missing.is_empty() {
      bail!(
        "LanceDB at {} is missing tables [{}]; run `kindred provision` first",
        data_dir.display(),
        missing.join(", ")
      );
    }

    for name in [INSIGHT_HISTORY, LATEST_INSIGHTS] {
      let stored = tables.vector_dimension(name, records::EMBEDDING_COLUMN).await?;
      if stored != Some(embedding_dimension) {
        let stored = stored.map_or_else(|| "no".to_string(), |n| n.to_string());
        bail!(
          "Table '{name}' at {} was provisioned with {stored} embedding dimensions but \
           storage.embedding_dimension is {embedding_dimension}; provision a new data_dir \
           or fix the config",
          data_dir.display()
        );
      }
    }

    info!(data_dir = %data_dir.display(), embedding_dimension, "Opened LanceDB store");
    Ok(Self { tables, embedding_dimension })
  }

  /// Create any missing tables and return the names that were created
  pub async fn provision(data_dir: &Path, embedding_dimension: usize) -> Result<Vec<&'static str>> {
    if embedding_dimension == 0 {
      bail!("Embedding dimension must be greater than zero");
    }
    let tables = TableManager::new(create_connection(data_dir).await?);
    tables.create_missing(embedding_dimension).await
  }

  async fn latest_row(&self, user_id: UserId) -> Result<Option<Insight>> {
    let batches =
      self.tables.select(LATEST_INSIGHTS, &format!("user_id = {user_id}"), None).await?;

    let mut latest: Option<Insight> = None;
    for batch in &batches {
      for insight in records::insights_from_batch(batch)? {
        if latest.as_ref().map_or(true, |l| insight.created_at >= l.created_at) {
          latest = Some(insight);
        }
      }
    }
    Ok(latest)
  }
}

#[async_trait]
impl InsightStore for LanceDbStore {
  async fn append(&self, insight: &Insight) -> Result<()> {
    let batch = records::insight_batch(std::slice::from_ref(insight), self.embedding_dimension)?;
    self.tables.add(INSIGHT_HISTORY, batch.clone()).await?;

    // Backfilled history never displaces a newer projection row
    if let Some(current) = self.latest_row(insight.user_id).await? {
      if current.created_at > insight.created_at {
        debug!(user_id = insight.user_id, "Kept newer latest insight");
        return Ok(());
      }
    }

    self.tables.delete(LATEST_INSIGHTS, &format!("user_id = {}", insight.user_id)).await?;
    self.tables.add(LATEST_INSIGHTS, batch).await?;
    debug!(user_id = insight.user_id, "Stored insight");
    Ok(())
  }

  async fn latest_for_user(&self, user_id: UserId) -> Result<Option<Insight>> {
    self.latest_row(user_id).await
  }

  async fn nearest(
    &self,
    embedding: &[f32],
    exclude_user_id: UserId,
    limit: usize,
  ) -> Result<Vec<Candidate>> {
    if embedding.len() != self.embedding_dimension {
      bail!(
        "Query embedding has {} dimensions, store expects {}",
        embedding.len(),
        self.embedding_dimension
      );
    }

    let table = self.tables.table(LATEST_INSIGHTS).await?;
    search::search_nearest(&table, embedding, exclude_user_id, limit).await
  }
}

#[async_trait]
impl ConnectionStore for LanceDbStore {
  async fn insert(&self, connection: NewConnection) -> Result<Connection> {
    let stored = connection.into_connection(Uuid::new_v4(), Utc::now());
    self.tables.add(CONNECTIONS, records::connection_batch(std::slice::from_ref(&stored))?).await?;
    Ok(stored)
  }

  async fn get(&self, id: Uuid) -> Result<Option<Connection>> {
    let batches = self.tables.select(CONNECTIONS, &format!("id = '{id}'"), Some(1)).await?;
    for batch in &batches {
      if let Some(connection) = records::connections_from_batch(batch)?.into_iter().next() {
        return Ok(Some(connection));
      }
    }
    Ok(None)
  }

  async fn mark_accepted(&self, id: Uuid) -> Result<()> {
    self.tables.update_column(CONNECTIONS, &format!("id = '{id}'"), "state", "'accepted'").await
  }
}

#[async_trait]
impl UserDirectory for LanceDbStore {
  async fn username(&self, user_id: UserId) -> Result<Option<String>> {
    let batches = self.tables.select(USERS, &format!("user_id = {user_id}"), Some(1)).await?;
    for batch in &batches {
      if let Some(user) = records::users_from_batch(batch)?.into_iter().next() {
        return Ok(Some(user.username));
      }
    }
    Ok(None)
  }
}

#[async_trait]
impl JournalSource for LanceDbStore {
  async fn recent_consented_summaries(
    &self,
    user_id: UserId,
    limit: usize,
  ) -> Result<Vec<JournalSummary>> {
    let predicate = format!("user_id = {user_id} AND consent = true");
    let mut summaries = Vec::new();
    for batch in &self.tables.select(JOURNALS, &predicate, None).await? {
      summaries.extend(records::journals_from_batch(batch)?);
    }

    summaries.sort_by(|a, b| b.entry_date.cmp(&a.entry_date));
    summaries.truncate(limit);
    Ok(summaries)
  }
}

#[async_trait]
impl JournalWriter for LanceDbStore {
  async fn record_user(&self, user: &User) -> Result<()> {
    self.tables.delete(USERS, &format!("user_id = {}", user.user_id)).await?;
    self.tables.add(USERS, records::user_batch(std::slice::from_ref(user))?).await
  }

  async fn record_summary(&self, summary: &JournalSummary) -> Result<()> {
    self.tables.add(JOURNALS, records::journal_batch(std::slice::from_ref(summary))?).await
  }
}
