//! Typed outcomes reported by the matcher, the insight pipeline and the
//! connection lifecycle

use std::fmt::Display;
use thiserror::Error;
use uuid::Uuid;

use crate::models::UserId;

pub type Result<T> = std::result::Result<T, MatchError>;

#[derive(Error, Debug)]
pub enum MatchError {
  #[error("No insight found for user {user_id}")]
  NotFound { user_id: UserId },

  #[error("No match within threshold for user {user_id}")]
  NoMatch { user_id: UserId },

  #[error("Not enough matches to form a group: found {found}, need {required}")]
  InsufficientCandidates { found: usize, required: usize },

  #[error("Upstream {provider} call failed: {message}")]
  UpstreamFailure { provider: &'static str, message: String },

  #[error("Store operation failed: {message}")]
  StoreFailure { message: String },

  #[error("Connection {id} not found")]
  ConnectionNotFound { id: Uuid },

  #[error("No consented journal entries found for user {user_id}")]
  NoJournalEntries { user_id: UserId },

  #[error("Invalid request: {message}")]
  InvalidRequest { message: String },
}

impl MatchError {
  pub fn upstream(provider: &'static str, error: impl Display) -> Self {
    Self::UpstreamFailure { provider, message: format!("{error:#}") }
  }

  pub fn store(error: impl Display) -> Self {
    Self::StoreFailure { message: format!("{error:#}") }
  }

  pub fn invalid(message: impl Into<String>) -> Self {
    Self::InvalidRequest { message: message.into() }
  }

  /// Outcomes that are common and not a failure of the service itself
  pub fn is_expected(&self) -> bool {
    matches!(self, Self::NoMatch { .. } | Self::InsufficientCandidates { .. })
  }

  /// Stable key used in API error payloads
  pub fn key(&self) -> &'static str {
    match self {
      Self::NotFound { .. } => "insight_not_found",
      Self::NoMatch { .. } => "no_match",
      Self::InsufficientCandidates { .. } => "insufficient_candidates",
      Self::UpstreamFailure { .. } => "upstream_failure",
      Self::StoreFailure { .. } => "store_failure",
      Self::ConnectionNotFound { .. } => "connection_not_found",
      Self::NoJournalEntries { .. } => "no_journal_entries",
      Self::InvalidRequest { .. } => "invalid_request",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_expected_outcomes() {
    assert!(MatchError::NoMatch { user_id: 1 }.is_expected());
    assert!(MatchError::InsufficientCandidates { found: 1, required: 2 }.is_expected());
    assert!(!MatchError::NotFound { user_id: 1 }.is_expected());
    assert!(!MatchError::store("disk full").is_expected());
  }

  #[test]
  fn test_upstream_message_keeps_cause_chain() {
    let cause = anyhow::anyhow!("connection reset").context("embedding request");
    let error = MatchError::upstream("embedding", cause);
    assert_eq!(error.to_string(), "Upstream embedding call failed: embedding request: connection reset");
  }
}
