//! Table management operations for LanceDB

use anyhow::{anyhow, bail, Result};
use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchIterator};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, Table};
use tracing::{debug, info};

use super::records;

pub const INSIGHT_HISTORY: &str = "insight_history";
pub const LATEST_INSIGHTS: &str = "latest_insights";
pub const CONNECTIONS: &str = "connections";
pub const USERS: &str = "users";
pub const JOURNALS: &str = "journals";

pub struct TableManager {
  connection: Connection,
}

impl TableManager {
  pub fn new(connection: Connection) -> Self {
    Self { connection }
  }

  /// Every table the service reads or writes, with its schema
  pub fn layout(embedding_dimension: usize) -> Vec<(&'static str, SchemaRef)> {
    vec![
      (INSIGHT_HISTORY, records::insight_schema(embedding_dimension)),
      (LATEST_INSIGHTS, records::insight_schema(embedding_dimension)),
      (CONNECTIONS, records::connection_schema()),
      (USERS, records::user_schema()),
      (JOURNALS, records::journal_schema()),
    ]
  }

  pub async fn table_names(&self) -> Result<Vec<String>> {
    self.connection.table_names().execute().await.map_err(|e| anyhow!("Failed to list tables: {e}"))
  }

  /// Names from `layout` that do not exist yet
  pub async fn missing_tables(&self, embedding_dimension: usize) -> Result<Vec<&'static str>> {
    let existing = self.table_names().await?;
    Ok(
      Self::layout(embedding_dimension)
        .into_iter()
        .map(|(name, _)| name)
        .filter(|name| !existing.iter().any(|e| e == name))
        .collect(),
    )
  }

  /// Open a table. Tables are only ever created by `create_missing`.
  pub async fn table(&self, name: &str) -> Result<Table> {
    match self.connection.open_table(name).execute().await {
      Ok(table) => Ok(table),
      Err(lancedb::Error::TableNotFound { .. }) => {
        bail!("Table '{name}' does not exist; run `kindred provision` first")
      }
      Err(e) => Err(anyhow!("Failed to open table '{name}': {e}")),
    }
  }

  /// Fixed length of the vector column `column` in table `name`, if it has one
  pub async fn vector_dimension(&self, name: &str, column: &str) -> Result<Option<usize>> {
    let schema = self
      .table(name)
      .await?
      .schema()
      .await
      .map_err(|e| anyhow!("Failed to read schema of '{name}': {e}"))?;

    Ok(schema.field_with_name(column).ok().and_then(|field| match field.data_type() {
      DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
      _ => None,
    }))
  }

  /// Create every missing table with an empty batch of the right schema
  pub async fn create_missing(&self, embedding_dimension: usize) -> Result<Vec<&'static str>> {
    let existing = self.table_names().await?;
    let mut created = Vec::new();

    for (name, schema) in Self::layout(embedding_dimension) {
      if existing.iter().any(|e| e == name) {
        debug!(table = name, "Table already exists");
        continue;
      }

      self
        .connection
        .create_empty_table(name, schema)
        .execute()
        .await
        .map_err(|e| anyhow!("Failed to create table '{name}': {e}"))?;
      info!(table = name, "Created table");
      created.push(name);
    }

    Ok(created)
  }

  pub async fn add(&self, name: &str, batch: RecordBatch) -> Result<()> {
    let schema = batch.schema();
    let batch_iter = RecordBatchIterator::new(vec![Ok(batch)], schema);

    self
      .table(name)
      .await?
      .add(batch_iter)
      .execute()
      .await
      .map_err(|e| anyhow!("Failed to add rows to '{name}': {e}"))?;
    Ok(())
  }

  pub async fn delete(&self, name: &str, predicate: &str) -> Result<()> {
    self
      .table(name)
      .await?
      .delete(predicate)
      .await
      .map_err(|e| anyhow!("Failed to delete from '{name}': {e}"))?;
    Ok(())
  }

  /// All batches matching `predicate`, optionally capped at `limit` rows
  pub async fn select(
    &self,
    name: &str,
    predicate: &str,
    limit: Option<usize>,
  ) -> Result<Vec<RecordBatch>> {
    let table = self.table(name).await?;
    let mut query = table.query().only_if(predicate);
    if let Some(limit) = limit {
      query = query.limit(limit);
    }

    let stream = query.execute().await.map_err(|e| anyhow!("Query on '{name}' failed: {e}"))?;
    stream
      .try_collect::<Vec<_>>()
      .await
      .map_err(|e| anyhow!("Error reading batch from '{name}': {e}"))
  }

  /// Overwrite a single column on the rows matching `predicate`
  pub async fn update_column(
    &self,
    name: &str,
    predicate: &str,
    column: &str,
    sql_value: &str,
  ) -> Result<()> {
    self
      .table(name)
      .await?
      .update()
      .only_if(predicate)
      .column(column, sql_value)
      .execute()
      .await
      .map_err(|e| anyhow!("Failed to update '{name}': {e}"))?;
    Ok(())
  }
}
