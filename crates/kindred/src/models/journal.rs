//! Read-only views of the journaling service's own tables

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::insight::UserId;

/// Privacy-preserving summary of one journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalSummary {
  pub user_id: UserId,
  pub summary: String,
  pub entry_date: DateTime<Utc>,
  /// Whether the author allowed this entry to feed AI insights
  pub consent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub user_id: UserId,
  pub username: String,
}
