//! Storage abstraction layer for insights, connections and journal data
//!
//! The matcher and the insight pipeline only talk to these traits, so the
//! LanceDB implementation and the in-memory one can be swapped without
//! touching higher-level code.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Candidate, Connection, Insight, JournalSummary, NewConnection, User, UserId};

/// Append-only insight storage with nearest-neighbor lookup
#[async_trait]
pub trait InsightStore: Send + Sync {
  /// Append a new insight. Earlier insights for the user are kept.
  async fn append(&self, insight: &Insight) -> Result<()>;

  /// Most recent insight for a user, if any
  async fn latest_for_user(&self, user_id: UserId) -> Result<Option<Insight>>;

  /// Up to `limit` other users ranked ascending by L2 distance to `embedding`.
  ///
  /// Each user is represented by their latest insight, so a user appears at
  /// most once. `exclude_user_id` never appears in the result.
  async fn nearest(
    &self,
    embedding: &[f32],
    exclude_user_id: UserId,
    limit: usize,
  ) -> Result<Vec<Candidate>>;
}

/// Connection writer: single-row inserts plus the acceptance update
#[async_trait]
pub trait ConnectionStore: Send + Sync {
  /// Persist a new connection in the `suggested` state and return the stored row
  async fn insert(&self, connection: NewConnection) -> Result<Connection>;

  async fn get(&self, id: Uuid) -> Result<Option<Connection>>;

  /// Set the state of `id` to `accepted`
  async fn mark_accepted(&self, id: Uuid) -> Result<()>;
}

/// Username lookup for pair display names
#[async_trait]
pub trait UserDirectory: Send + Sync {
  async fn username(&self, user_id: UserId) -> Result<Option<String>>;
}

/// Source of consented journal summaries for insight generation
#[async_trait]
pub trait JournalSource: Send + Sync {
  /// Up to `limit` consented summaries, newest first
  async fn recent_consented_summaries(
    &self,
    user_id: UserId,
    limit: usize,
  ) -> Result<Vec<JournalSummary>>;
}

/// Writer for the user and journal summary tables fed by ingestion
#[async_trait]
pub trait JournalWriter: Send + Sync {
  /// Insert or replace the username for `user.user_id`
  async fn record_user(&self, user: &User) -> Result<()>;

  async fn record_summary(&self, summary: &JournalSummary) -> Result<()>;
}
