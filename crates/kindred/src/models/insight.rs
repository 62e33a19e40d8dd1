//! Insight and nearest-neighbor candidate records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Users are keyed by the integer id of the journaling service.
pub type UserId = i64;

/// A generated summary of a user's recent journal entries plus its embedding.
///
/// Insights are append-only: a newer insight supersedes an older one for
/// matching purposes, but nothing is ever rewritten in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
  pub user_id: UserId,
  pub text: String,
  pub embedding: Vec<f32>,
  pub created_at: DateTime<Utc>,
}

impl Insight {
  pub fn new(user_id: UserId, text: impl Into<String>, embedding: Vec<f32>) -> Self {
    Self { user_id, text: text.into(), embedding, created_at: Utc::now() }
  }

  /// Same as [`Insight::new`] with an explicit timestamp
  pub fn at(
    user_id: UserId,
    text: impl Into<String>,
    embedding: Vec<f32>,
    created_at: DateTime<Utc>,
  ) -> Self {
    Self { user_id, text: text.into(), embedding, created_at }
  }

  pub fn dimension(&self) -> usize {
    self.embedding.len()
  }
}

/// One row of a nearest-neighbor query. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
  pub user_id: UserId,
  pub insight_text: String,
  /// Plain Euclidean distance to the requesting user's latest insight
  pub distance: f32,
}

impl Candidate {
  pub fn new(user_id: UserId, insight_text: impl Into<String>, distance: f32) -> Self {
    Self { user_id, insight_text: insight_text.into(), distance }
  }

  /// Strictly closer than `threshold`; a candidate sitting on the boundary is excluded.
  pub fn within(&self, threshold: f32) -> bool {
    self.distance < threshold
  }
}

/// Plain (non-squared) Euclidean distance.
///
/// Vectors of different lengths are compared over their common prefix; stores
/// reject mismatched dimensions before this is ever reached.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
  a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
}
