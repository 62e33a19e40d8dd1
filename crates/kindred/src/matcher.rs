//! Similarity matching over insight embeddings
//!
//! The matcher reads a user's latest insight, asks the insight store for the
//! nearest other users, keeps the ones strictly inside the distance threshold
//! and turns them into a pair or group connection.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::config::MatchSettings;
use crate::error::{MatchError, Result};
use crate::labels;
use crate::models::{Candidate, Connection, Insight, NewConnection, UserId};
use crate::services::generation::TextGenerator;
use crate::services::stores::{ConnectionStore, InsightStore, UserDirectory};

pub struct Matcher {
  insights: Arc<dyn InsightStore>,
  connections: Arc<dyn ConnectionStore>,
  users: Arc<dyn UserDirectory>,
  generator: Arc<dyn TextGenerator>,
  settings: MatchSettings,
}

impl Matcher {
  pub fn new(
    insights: Arc<dyn InsightStore>,
    connections: Arc<dyn ConnectionStore>,
    users: Arc<dyn UserDirectory>,
    generator: Arc<dyn TextGenerator>,
    settings: MatchSettings,
  ) -> Self {
    Self { insights, connections, users, generator, settings }
  }

  pub fn settings(&self) -> &MatchSettings {
    &self.settings
  }

  /// Up to `k` other users strictly closer than `threshold`, nearest first
  #[instrument(skip(self))]
  pub async fn find_nearest(
    &self,
    user_id: UserId,
    k: usize,
    threshold: f32,
  ) -> Result<Vec<Candidate>> {
    let (_, candidates) = self.nearest_to_latest(user_id, k, threshold).await?;
    Ok(candidates)
  }

  /// Suggest a two-party connection with the single nearest user
  #[instrument(skip(self))]
  pub async fn propose_pair(&self, user_id: UserId) -> Result<Connection> {
    let (insight, candidates) =
      self.nearest_to_latest(user_id, self.settings.pair_k, self.settings.pair_threshold).await?;

    let best = candidates.first().ok_or(MatchError::NoMatch { user_id })?;

    let display_name = self
      .users
      .username(best.user_id)
      .await
      .map_err(MatchError::store)?
      .unwrap_or_else(|| format!("User {}", best.user_id));

    let proposal = NewConnection::pair(user_id, best, display_name, insight.text);
    let connection = self.connections.insert(proposal).await.map_err(MatchError::store)?;

    info!(
      user_id,
      matched = best.user_id,
      distance = best.distance,
      connection = %connection.id,
      "Suggested pair connection"
    );
    Ok(connection)
  }

  /// Suggest a group connection with every nearby user, named by the text generator
  #[instrument(skip(self))]
  pub async fn propose_group(&self, user_id: UserId) -> Result<Connection> {
    let required = self.settings.min_group_size.max(2);
    let (insight, candidates) =
      self.nearest_to_latest(user_id, self.settings.group_k, self.settings.group_threshold).await?;

    if candidates.len() < required {
      debug!(user_id, found = candidates.len(), required, "Not enough candidates for a group");
      return Err(MatchError::InsufficientCandidates { found: candidates.len(), required });
    }

    let prompt = labels::group_prompt(&insight.text, &candidates);
    let reply = self
      .generator
      .generate(&prompt)
      .await
      .map_err(|e| MatchError::upstream("label generation", e))?;
    let label = labels::label_or_default(&reply, &self.settings.default_group_label);

    let proposal = NewConnection::group(user_id, &candidates, label, insight.text)
      .ok_or(MatchError::InsufficientCandidates { found: 0, required })?;
    let connection = self.connections.insert(proposal).await.map_err(MatchError::store)?;

    info!(
      user_id,
      members = ?connection.matched_ids,
      label = %connection.display_name,
      connection = %connection.id,
      "Suggested group connection"
    );
    Ok(connection)
  }

  async fn nearest_to_latest(
    &self,
    user_id: UserId,
    k: usize,
    threshold: f32,
  ) -> Result<(Insight, Vec<Candidate>)> {
    if k == 0 {
      return Err(MatchError::invalid("k must be greater than 0"));
    }
    if threshold.is_nan() {
      return Err(MatchError::invalid("threshold must be a number"));
    }

    let insight = self
      .insights
      .latest_for_user(user_id)
      .await
      .map_err(MatchError::store)?
      .ok_or(MatchError::NotFound { user_id })?;

    let rows =
      self.insights.nearest(&insight.embedding, user_id, k).await.map_err(MatchError::store)?;
    let candidates = select_candidates(user_id, rows, k, threshold);

    debug!(user_id, k, threshold, kept = candidates.len(), "Filtered nearest neighbors");
    Ok((insight, candidates))
  }
}

/// Drop the requester and anything at or beyond `threshold`, keep at most `k`.
///
/// The sort is stable, so equal distances keep the store's order.
fn select_candidates(
  user_id: UserId,
  rows: Vec<Candidate>,
  k: usize,
  threshold: f32,
) -> Vec<Candidate> {
  let mut candidates: Vec<Candidate> =
    rows.into_iter().filter(|c| c.user_id != user_id && c.within(threshold)).collect();
  candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
  candidates.truncate(k);
  candidates
}
