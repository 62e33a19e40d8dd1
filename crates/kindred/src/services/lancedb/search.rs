//! Vector search over `latest_insights` and result processing

use anyhow::{anyhow, Result};
use arrow::array::{Array, Float32Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use tracing::debug;

use super::records::{column, EMBEDDING_COLUMN};
use crate::models::{Candidate, UserId};

/// Nearest other users by L2 distance, ascending
pub async fn search_nearest(
  table: &Table,
  query_embedding: &[f32],
  exclude_user_id: UserId,
  limit: usize,
) -> Result<Vec<Candidate>> {
  if limit == 0 {
    return Ok(Vec::new());
  }

  let batches: Vec<RecordBatch> = table
    .vector_search(query_embedding)?
    .column(EMBEDDING_COLUMN)
    .distance_type(DistanceType::L2)
    .only_if(format!("user_id != {exclude_user_id}"))
    .limit(limit)
    .execute()
    .await
    .map_err(|e| anyhow!("Vector search failed: {e}"))?
    .try_collect()
    .await
    .map_err(|e| anyhow!("Error reading search batch: {e}"))?;

  let mut candidates = Vec::new();
  for batch in &batches {
    candidates.extend(candidates_from_batch(batch)?);
  }

  // Batches are each ordered; the concatenation is not guaranteed to be
  candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
  candidates.truncate(limit);

  if candidates.is_empty() {
    debug!(exclude_user_id, "No neighbors found");
  }
  Ok(candidates)
}

fn candidates_from_batch(batch: &RecordBatch) -> Result<Vec<Candidate>> {
  let user_ids = column::<Int64Array>(batch, "user_id")?;
  let texts = column::<StringArray>(batch, "insight_text")?;
  let distances = column::<Float32Array>(batch, "_distance")?;

  let mut candidates = Vec::with_capacity(batch.num_rows());
  for row in 0..batch.num_rows() {
    if distances.is_null(row) {
      continue;
    }
    candidates.push(Candidate::new(
      user_ids.value(row),
      texts.value(row),
      euclidean_from_squared(distances.value(row)),
    ));
  }
  Ok(candidates)
}

/// LanceDB reports squared L2 distance
fn euclidean_from_squared(distance: f32) -> f32 {
  distance.max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_squared_distance_conversion() {
    assert!((euclidean_from_squared(0.09) - 0.3).abs() < 1e-6);
    assert_eq!(euclidean_from_squared(0.0), 0.0);
    assert_eq!(euclidean_from_squared(-1e-7), 0.0);
  }
}
