//! In-memory implementation of every store trait
//!
//! Used by the test suites and by builds without the `lancedb-store` feature.
//! Nearest-neighbor search is a brute-force scan over each user's latest
//! insight.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use super::stores::{ConnectionStore, InsightStore, JournalSource, JournalWriter, UserDirectory};
use crate::models::insight::l2_distance;
use crate::models::{Candidate, Connection, Insight, JournalSummary, NewConnection, User, UserId};

#[derive(Default)]
struct MemoryState {
  insights: Vec<Insight>,
  connections: Vec<Connection>,
  users: HashMap<UserId, String>,
  journals: Vec<JournalSummary>,
}

#[derive(Default)]
pub struct MemoryStore {
  state: RwLock<MemoryState>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_user(&self, user_id: UserId, username: impl Into<String>) -> Result<()> {
    self.write()?.users.insert(user_id, username.into());
    Ok(())
  }

  pub fn add_journal(&self, summary: JournalSummary) -> Result<()> {
    self.write()?.journals.push(summary);
    Ok(())
  }

  /// Every insight ever appended, oldest first
  pub fn insights(&self) -> Result<Vec<Insight>> {
    Ok(self.read()?.insights.clone())
  }

  /// Every stored connection in insertion order
  pub fn connections(&self) -> Result<Vec<Connection>> {
    Ok(self.read()?.connections.clone())
  }

  fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>> {
    self.state.read().map_err(|_| anyhow!("Memory store lock poisoned"))
  }

  fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>> {
    self.state.write().map_err(|_| anyhow!("Memory store lock poisoned"))
  }
}

/// Latest insight per user. Later appends win timestamp ties.
fn latest_by_user(insights: &[Insight]) -> HashMap<UserId, &Insight> {
  let mut latest: HashMap<UserId, &Insight> = HashMap::new();
  for insight in insights {
    match latest.get(&insight.user_id) {
      Some(current) if current.created_at > insight.created_at => {}
      _ => {
        latest.insert(insight.user_id, insight);
      }
    }
  }
  latest
}

#[async_trait]
impl InsightStore for MemoryStore {
  async fn append(&self, insight: &Insight) -> Result<()> {
    self.write()?.insights.push(insight.clone());
    Ok(())
  }

  async fn latest_for_user(&self, user_id: UserId) -> Result<Option<Insight>> {
    let state = self.read()?;
    Ok(latest_by_user(&state.insights).remove(&user_id).cloned())
  }

  async fn nearest(
    &self,
    embedding: &[f32],
    exclude_user_id: UserId,
    limit: usize,
  ) -> Result<Vec<Candidate>> {
    let state = self.read()?;
    let latest = latest_by_user(&state.insights);

    // Scan in first-append order so equal distances keep a stable, natural order
    let mut order: Vec<&Insight> = latest.into_values().collect();
    order.sort_by_key(|insight| {
      state.insights.iter().position(|i| i.user_id == insight.user_id).unwrap_or(usize::MAX)
    });

    let mut candidates = Vec::with_capacity(order.len());
    for insight in order.into_iter().filter(|i| i.user_id != exclude_user_id) {
      if insight.embedding.len() != embedding.len() {
        bail!(
          "Embedding dimension mismatch for user {}: stored {}, query {}",
          insight.user_id,
          insight.embedding.len(),
          embedding.len()
        );
      }
      let distance = l2_distance(embedding, &insight.embedding);
      candidates.push(Candidate::new(insight.user_id, insight.text.clone(), distance));
    }

    candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    candidates.truncate(limit);
    Ok(candidates)
  }
}

#[async_trait]
impl ConnectionStore for MemoryStore {
  async fn insert(&self, connection: NewConnection) -> Result<Connection> {
    let stored = connection.into_connection(Uuid::new_v4(), Utc::now());
    self.write()?.connections.push(stored.clone());
    Ok(stored)
  }

  async fn get(&self, id: Uuid) -> Result<Option<Connection>> {
    Ok(self.read()?.connections.iter().find(|c| c.id == id).cloned())
  }

  async fn mark_accepted(&self, id: Uuid) -> Result<()> {
    let mut state = self.write()?;
    let connection = state
      .connections
      .iter_mut()
      .find(|c| c.id == id)
      .ok_or_else(|| anyhow!("Connection {id} does not exist"))?;
    connection.accept();
    Ok(())
  }
}

#[async_trait]
impl UserDirectory for MemoryStore {
  async fn username(&self, user_id: UserId) -> Result<Option<String>> {
    Ok(self.read()?.users.get(&user_id).cloned())
  }
}

#[async_trait]
impl JournalSource for MemoryStore {
  async fn recent_consented_summaries(
    &self,
    user_id: UserId,
    limit: usize,
  ) -> Result<Vec<JournalSummary>> {
    let state = self.read()?;
    let mut summaries: Vec<JournalSummary> =
      state.journals.iter().filter(|j| j.user_id == user_id && j.consent).cloned().collect();

    summaries.sort_by(|a, b| b.entry_date.cmp(&a.entry_date));
    summaries.truncate(limit);
    Ok(summaries)
  }
}

#[async_trait]
impl JournalWriter for MemoryStore {
  async fn record_user(&self, user: &User) -> Result<()> {
    self.add_user(user.user_id, user.username.clone())
  }

  async fn record_summary(&self, summary: &JournalSummary) -> Result<()> {
    self.add_journal(summary.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  #[tokio::test]
  async fn test_latest_insight_wins() -> Result<()> {
    let store = MemoryStore::new();
    let now = Utc::now();
    store.append(&Insight::at(1, "old", vec![0.0, 0.0], now - Duration::days(1))).await?;
    store.append(&Insight::at(1, "new", vec![1.0, 0.0], now)).await?;

    let latest = store.latest_for_user(1).await?.unwrap();
    assert_eq!(latest.text, "new");
    assert_eq!(store.insights()?.len(), 2);
    Ok(())
  }

  #[tokio::test]
  async fn test_backfilled_insight_does_not_replace_newer_one() -> Result<()> {
    let store = MemoryStore::new();
    let now = Utc::now();
    store.append(&Insight::at(2, "current", vec![0.5, 0.0], now)).await?;
    store.append(&Insight::at(2, "backfill", vec![0.1, 0.0], now - Duration::days(3))).await?;

    assert_eq!(store.latest_for_user(2).await?.unwrap().text, "current");
    let rows = store.nearest(&[0.0, 0.0], 1, 5).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].insight_text, "current");
    Ok(())
  }

  #[tokio::test]
  async fn test_nearest_uses_each_users_latest_insight_once() -> Result<()> {
    let store = MemoryStore::new();
    let now = Utc::now();
    store.append(&Insight::at(2, "stale", vec![0.1, 0.0], now - Duration::days(2))).await?;
    store.append(&Insight::at(2, "fresh", vec![0.6, 0.0], now)).await?;
    store.append(&Insight::at(3, "other", vec![0.4, 0.0], now)).await?;
    store.append(&Insight::at(1, "me", vec![0.0, 0.0], now)).await?;

    let rows = store.nearest(&[0.0, 0.0], 1, 10).await?;
    let ids: Vec<UserId> = rows.iter().map(|c| c.user_id).collect();
    assert_eq!(ids, vec![3, 2]);
    assert_eq!(rows[1].insight_text, "fresh");
    Ok(())
  }

  #[tokio::test]
  async fn test_nearest_rejects_dimension_mismatch() -> Result<()> {
    let store = MemoryStore::new();
    store.append(&Insight::new(2, "three dims", vec![0.0, 0.0, 0.0])).await?;

    assert!(store.nearest(&[0.0, 0.0], 1, 5).await.is_err());
    Ok(())
  }

  #[tokio::test]
  async fn test_journal_summaries_filter_consent_and_order() -> Result<()> {
    let store = MemoryStore::new();
    let now = Utc::now();
    for (days_ago, consent) in [(3, true), (1, false), (2, true), (0, true)] {
      store.add_journal(JournalSummary {
        user_id: 7,
        summary: format!("{days_ago} days ago"),
        entry_date: now - Duration::days(days_ago),
        consent,
      })?;
    }

    let summaries = store.recent_consented_summaries(7, 2).await?;
    let texts: Vec<&str> = summaries.iter().map(|s| s.summary.as_str()).collect();
    assert_eq!(texts, vec!["0 days ago", "2 days ago"]);
    Ok(())
  }
}
