//! Connection records and their lifecycle

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::insight::{Candidate, UserId};

/// Lifecycle state of a connection. Only ever moves `Suggested -> Accepted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
  Suggested,
  Accepted,
}

impl ConnectionState {
  pub fn as_str(&self) -> &'static str {
    match self {
      ConnectionState::Suggested => "suggested",
      ConnectionState::Accepted => "accepted",
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, ConnectionState::Accepted)
  }
}

impl fmt::Display for ConnectionState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ConnectionState {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "suggested" => Ok(ConnectionState::Suggested),
      "accepted" => Ok(ConnectionState::Accepted),
      other => Err(format!("unknown connection state '{other}'")),
    }
  }
}

/// A connection proposal that has not been written yet.
///
/// Built only through [`NewConnection::pair`] and [`NewConnection::group`] so
/// `matched_ids` is never empty and `is_group` always agrees with it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewConnection {
  user_id: UserId,
  matched_ids: Vec<UserId>,
  display_name: String,
  user_insight_text: String,
  matched_insight_text: String,
}

impl NewConnection {
  /// Two-party connection with the matched user's name as display name
  pub fn pair(
    user_id: UserId,
    candidate: &Candidate,
    display_name: impl Into<String>,
    user_insight_text: impl Into<String>,
  ) -> Self {
    Self {
      user_id,
      matched_ids: vec![candidate.user_id],
      display_name: display_name.into(),
      user_insight_text: user_insight_text.into(),
      matched_insight_text: candidate.insight_text.clone(),
    }
  }

  /// Group connection over `candidates`, kept in the order given.
  ///
  /// Returns `None` for an empty candidate list.
  pub fn group(
    user_id: UserId,
    candidates: &[Candidate],
    label: impl Into<String>,
    user_insight_text: impl Into<String>,
  ) -> Option<Self> {
    if candidates.is_empty() {
      return None;
    }

    let matched_insight_text =
      candidates.iter().map(|c| c.insight_text.as_str()).collect::<Vec<_>>().join("\n\n");

    Some(Self {
      user_id,
      matched_ids: candidates.iter().map(|c| c.user_id).collect(),
      display_name: label.into(),
      user_insight_text: user_insight_text.into(),
      matched_insight_text,
    })
  }

  fn is_group(&self) -> bool {
    self.matched_ids.len() > 1
  }

  /// Materialize the stored connection. State is always `Suggested`.
  pub fn into_connection(self, id: Uuid, created_at: DateTime<Utc>) -> Connection {
    let is_group = self.is_group();
    Connection {
      id,
      user_id: self.user_id,
      matched_ids: self.matched_ids,
      display_name: self.display_name,
      is_group,
      state: ConnectionState::Suggested,
      user_insight_text: self.user_insight_text,
      matched_insight_text: self.matched_insight_text,
      created_at,
    }
  }
}

/// A persisted pairing or grouping of users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Connection {
  pub id: Uuid,
  pub user_id: UserId,
  pub matched_ids: Vec<UserId>,
  pub display_name: String,
  pub is_group: bool,
  pub state: ConnectionState,
  pub user_insight_text: String,
  pub matched_insight_text: String,
  pub created_at: DateTime<Utc>,
}

impl Connection {
  /// Move to `Accepted`. Returns false when the connection was already accepted.
  pub fn accept(&mut self) -> bool {
    if self.state.is_terminal() {
      return false;
    }
    self.state = ConnectionState::Accepted;
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn candidate(user_id: UserId, text: &str) -> Candidate {
    Candidate::new(user_id, text, 0.1)
  }

  #[test]
  fn test_pair_is_not_group_and_starts_suggested() {
    let new = NewConnection::pair(1, &candidate(2, "likes running"), "sam", "runs a lot");
    assert!(!new.is_group());

    let connection = new.into_connection(Uuid::new_v4(), Utc::now());
    assert_eq!(connection.matched_ids, vec![2]);
    assert_eq!(connection.state, ConnectionState::Suggested);
    assert_eq!(connection.matched_insight_text, "likes running");
    assert!(!connection.is_group);
  }

  #[test]
  fn test_group_keeps_candidate_order() {
    let candidates = vec![candidate(4, "first"), candidate(2, "second")];
    let new = NewConnection::group(1, &candidates, "Night Owls", "mine").unwrap();
    assert!(new.is_group());

    let connection = new.into_connection(Uuid::new_v4(), Utc::now());
    assert_eq!(connection.matched_ids, vec![4, 2]);
    assert_eq!(connection.matched_insight_text, "first\n\nsecond");
    assert!(connection.is_group);
  }

  #[test]
  fn test_group_of_nothing_is_rejected() {
    assert!(NewConnection::group(1, &[], "label", "mine").is_none());
  }

  #[test]
  fn test_accept_is_forward_only_and_idempotent() {
    let mut connection = NewConnection::pair(1, &candidate(2, "x"), "sam", "y")
      .into_connection(Uuid::new_v4(), Utc::now());

    assert!(connection.accept());
    assert_eq!(connection.state, ConnectionState::Accepted);
    assert!(!connection.accept());
    assert_eq!(connection.state, ConnectionState::Accepted);
  }

  #[test]
  fn test_state_round_trips_through_text() {
    assert_eq!("accepted".parse::<ConnectionState>().unwrap(), ConnectionState::Accepted);
    assert_eq!(ConnectionState::Suggested.to_string(), "suggested");
    assert!("declined".parse::<ConnectionState>().is_err());
  }
}
