//! Arrow schemas and RecordBatch conversion for every Kindred table

use anyhow::{anyhow, bail, Context, Result};
use arrow::array::builder::{FixedSizeListBuilder, Float32Builder, Int64Builder, ListBuilder};
use arrow::array::{
  Array, ArrayRef, BooleanArray, FixedSizeListArray, Float32Array, Int64Array, ListArray,
  StringArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Connection, ConnectionState, Insight, JournalSummary, User};

pub const EMBEDDING_COLUMN: &str = "embedding";

// Schemas
// =======

/// Shared by `insight_history` and `latest_insights`
pub fn insight_schema(embedding_dimension: usize) -> SchemaRef {
  Arc::new(Schema::new(vec![
    Field::new("user_id", DataType::Int64, false),
    Field::new("insight_text", DataType::Utf8, false),
    Field::new(
      EMBEDDING_COLUMN,
      DataType::FixedSizeList(
        Arc::new(Field::new("item", DataType::Float32, true)),
        embedding_dimension as i32,
      ),
      false,
    ),
    Field::new("created_at", DataType::Utf8, false),
  ]))
}

pub fn connection_schema() -> SchemaRef {
  Arc::new(Schema::new(vec![
    Field::new("id", DataType::Utf8, false),
    Field::new("user_id", DataType::Int64, false),
    Field::new(
      "matched_ids",
      DataType::List(Arc::new(Field::new("item", DataType::Int64, true))),
      false,
    ),
    Field::new("display_name", DataType::Utf8, false),
    Field::new("is_group", DataType::Boolean, false),
    Field::new("state", DataType::Utf8, false),
    Field::new("user_insight_text", DataType::Utf8, false),
    Field::new("matched_insight_text", DataType::Utf8, false),
    Field::new("created_at", DataType::Utf8, false),
  ]))
}

pub fn user_schema() -> SchemaRef {
  Arc::new(Schema::new(vec![
    Field::new("user_id", DataType::Int64, false),
    Field::new("username", DataType::Utf8, false),
  ]))
}

pub fn journal_schema() -> SchemaRef {
  Arc::new(Schema::new(vec![
    Field::new("user_id", DataType::Int64, false),
    Field::new("summary", DataType::Utf8, false),
    Field::new("entry_date", DataType::Utf8, false),
    Field::new("consent", DataType::Boolean, false),
  ]))
}

// Writing
// =======

pub fn insight_batch(insights: &[Insight], embedding_dimension: usize) -> Result<RecordBatch> {
  validate_not_empty(insights.len())?;

  let mut embeddings = FixedSizeListBuilder::new(
    Float32Builder::with_capacity(embedding_dimension * insights.len()),
    embedding_dimension as i32,
  );
  for insight in insights {
    if insight.dimension() != embedding_dimension {
      bail!(
        "Insight for user {} has {} dimensions, table expects {}",
        insight.user_id,
        insight.dimension(),
        embedding_dimension
      );
    }
    embeddings.values().append_slice(&insight.embedding);
    embeddings.append(true);
  }

  let columns: Vec<ArrayRef> = vec![
    Arc::new(Int64Array::from_iter_values(insights.iter().map(|i| i.user_id))),
    Arc::new(StringArray::from_iter_values(insights.iter().map(|i| i.text.as_str()))),
    Arc::new(embeddings.finish()),
    Arc::new(StringArray::from_iter_values(insights.iter().map(|i| i.created_at.to_rfc3339()))),
  ];

  assemble(insight_schema(embedding_dimension), columns)
}

pub fn connection_batch(connections: &[Connection]) -> Result<RecordBatch> {
  validate_not_empty(connections.len())?;

  let mut matched_ids = ListBuilder::new(Int64Builder::new());
  for connection in connections {
    matched_ids.values().append_slice(&connection.matched_ids);
    matched_ids.append(true);
  }

  let columns: Vec<ArrayRef> = vec![
    Arc::new(StringArray::from_iter_values(connections.iter().map(|c| c.id.to_string()))),
    Arc::new(Int64Array::from_iter_values(connections.iter().map(|c| c.user_id))),
    Arc::new(matched_ids.finish()),
    Arc::new(StringArray::from_iter_values(connections.iter().map(|c| c.display_name.as_str()))),
    Arc::new(BooleanArray::from(connections.iter().map(|c| c.is_group).collect::<Vec<_>>())),
    Arc::new(StringArray::from_iter_values(connections.iter().map(|c| c.state.as_str()))),
    Arc::new(StringArray::from_iter_values(
      connections.iter().map(|c| c.user_insight_text.as_str()),
    )),
    Arc::new(StringArray::from_iter_values(
      connections.iter().map(|c| c.matched_insight_text.as_str()),
    )),
    Arc::new(StringArray::from_iter_values(connections.iter().map(|c| c.created_at.to_rfc3339()))),
  ];

  assemble(connection_schema(), columns)
}

pub fn user_batch(users: &[User]) -> Result<RecordBatch> {
  validate_not_empty(users.len())?;

  let columns: Vec<ArrayRef> = vec![
    Arc::new(Int64Array::from_iter_values(users.iter().map(|u| u.user_id))),
    Arc::new(StringArray::from_iter_values(users.iter().map(|u| u.username.as_str()))),
  ];

  assemble(user_schema(), columns)
}

pub fn journal_batch(summaries: &[JournalSummary]) -> Result<RecordBatch> {
  validate_not_empty(summaries.len())?;

  let columns: Vec<ArrayRef> = vec![
    Arc::new(Int64Array::from_iter_values(summaries.iter().map(|s| s.user_id))),
    Arc::new(StringArray::from_iter_values(summaries.iter().map(|s| s.summary.as_str()))),
    Arc::new(StringArray::from_iter_values(summaries.iter().map(|s| s.entry_date.to_rfc3339()))),
    Arc::new(BooleanArray::from(summaries.iter().map(|s| s.consent).collect::<Vec<_>>())),
  ];

  assemble(journal_schema(), columns)
}

fn validate_not_empty(len: usize) -> Result<()> {
  if len == 0 {
    bail!("Cannot create RecordBatch from empty records");
  }
  Ok(())
}

fn assemble(schema: SchemaRef, columns: Vec<ArrayRef>) -> Result<RecordBatch> {
  RecordBatch::try_new(schema, columns).context("Failed to create RecordBatch")
}

// Reading
// =======

pub fn insights_from_batch(batch: &RecordBatch) -> Result<Vec<Insight>> {
  let user_ids = column::<Int64Array>(batch, "user_id")?;
  let texts = column::<StringArray>(batch, "insight_text")?;
  let embeddings = column::<FixedSizeListArray>(batch, EMBEDDING_COLUMN)?;
  let created = column::<StringArray>(batch, "created_at")?;

  (0..batch.num_rows())
    .map(|row| {
      Ok(Insight::at(
        user_ids.value(row),
        texts.value(row),
        embedding_at(embeddings, row)?,
        parse_timestamp(created.value(row))?,
      ))
    })
    .collect()
}

pub fn connections_from_batch(batch: &RecordBatch) -> Result<Vec<Connection>> {
  let ids = column::<StringArray>(batch, "id")?;
  let user_ids = column::<Int64Array>(batch, "user_id")?;
  let matched = column::<ListArray>(batch, "matched_ids")?;
  let names = column::<StringArray>(batch, "display_name")?;
  let groups = column::<BooleanArray>(batch, "is_group")?;
  let states = column::<StringArray>(batch, "state")?;
  let user_texts = column::<StringArray>(batch, "user_insight_text")?;
  let matched_texts = column::<StringArray>(batch, "matched_insight_text")?;
  let created = column::<StringArray>(batch, "created_at")?;

  (0..batch.num_rows())
    .map(|row| {
      let matched_row = matched.value(row);
      let matched_ids = matched_row
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| anyhow!("Failed to cast 'matched_ids' items to Int64Array"))?
        .values()
        .to_vec();

      Ok(Connection {
        id: Uuid::parse_str(ids.value(row)).context("Invalid connection id")?,
        user_id: user_ids.value(row),
        matched_ids,
        display_name: names.value(row).to_string(),
        is_group: groups.value(row),
        state: states.value(row).parse::<ConnectionState>().map_err(|e| anyhow!(e))?,
        user_insight_text: user_texts.value(row).to_string(),
        matched_insight_text: matched_texts.value(row).to_string(),
        created_at: parse_timestamp(created.value(row))?,
      })
    })
    .collect()
}

pub fn users_from_batch(batch: &RecordBatch) -> Result<Vec<User>> {
  let user_ids = column::<Int64Array>(batch, "user_id")?;
  let usernames = column::<StringArray>(batch, "username")?;

  Ok(
    (0..batch.num_rows())
      .map(|row| User { user_id: user_ids.value(row), username: usernames.value(row).to_string() })
      .collect(),
  )
}

pub fn journals_from_batch(batch: &RecordBatch) -> Result<Vec<JournalSummary>> {
  let user_ids = column::<Int64Array>(batch, "user_id")?;
  let summaries = column::<StringArray>(batch, "summary")?;
  let dates = column::<StringArray>(batch, "entry_date")?;
  let consents = column::<BooleanArray>(batch, "consent")?;

  (0..batch.num_rows())
    .map(|row| {
      Ok(JournalSummary {
        user_id: user_ids.value(row),
        summary: summaries.value(row).to_string(),
        entry_date: parse_timestamp(dates.value(row))?,
        consent: consents.value(row),
      })
    })
    .collect()
}

/// Downcast a named column to its concrete Arrow array type
pub(super) fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
  batch
    .column_by_name(name)
    .ok_or_else(|| anyhow!("Missing '{name}' column"))?
    .as_any()
    .downcast_ref::<T>()
    .ok_or_else(|| anyhow!("Unexpected type for '{name}' column"))
}

fn embedding_at(embeddings: &FixedSizeListArray, row: usize) -> Result<Vec<f32>> {
  let values = embeddings.value(row);
  let floats = values
    .as_any()
    .downcast_ref::<Float32Array>()
    .ok_or_else(|| anyhow!("Failed to cast 'embedding' items to Float32Array"))?;
  Ok(floats.values().to_vec())
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(value)
    .map(|t| t.with_timezone(&Utc))
    .with_context(|| format!("Invalid timestamp '{value}'"))
}
