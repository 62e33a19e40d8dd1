//! Journal ingestion: raw entries -> privacy summaries -> journal table
//!
//! Entries arrive either one at a time (`kindred journal`) or in bulk from an
//! import file (`kindred import`). An entry that
//! already carries a summary is stored as is. An entry with only raw content
//! is summarized by the text generator first, but only when its author
//! consented; unconsented entries are recorded with an empty summary and never
//! leave the service.

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::{MatchError, Result};
use crate::models::{JournalSummary, User, UserId};
use crate::services::generation::TextGenerator;
use crate::services::stores::JournalWriter;

/// One journal entry to ingest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
  pub user_id: UserId,

  /// Raw entry text, summarized before storage
  #[serde(default)]
  pub content: Option<String>,

  /// Ready-made summary, stored without calling the generator
  #[serde(default)]
  pub summary: Option<String>,

  #[serde(default = "Utc::now")]
  pub entry_date: DateTime<Utc>,

  pub consent: bool,
}

/// Bulk import file: users plus their journal entries
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImportDocument {
  pub users: Vec<User>,
  pub journals: Vec<JournalEntry>,
}

impl ImportDocument {
  /// Parse a YAML (or JSON) import file
  pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read import file: {}", path.display()))?;
    serde_yaml::from_str(&content)
      .with_context(|| format!("Failed to parse import file: {}", path.display()))
  }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ImportReport {
  pub users: usize,
  pub entries: usize,
  /// Entries whose summary came from the generator
  pub summarized: usize,
}

pub struct JournalIngest {
  writer: Arc<dyn JournalWriter>,
  generator: Arc<dyn TextGenerator>,
}

impl JournalIngest {
  pub fn new(writer: Arc<dyn JournalWriter>, generator: Arc<dyn TextGenerator>) -> Self {
    Self { writer, generator }
  }

  /// Summarize (when needed) and store one entry
  #[instrument(skip(self, entry), fields(user_id = entry.user_id))]
  pub async fn add_entry(&self, entry: JournalEntry) -> Result<JournalSummary> {
    let summary = self.summary_for(&entry).await?;
    let stored = JournalSummary {
      user_id: entry.user_id,
      summary,
      entry_date: entry.entry_date,
      consent: entry.consent,
    };

    self.writer.record_summary(&stored).await.map_err(MatchError::store)?;
    debug!(consent = stored.consent, "Stored journal summary");
    Ok(stored)
  }

  /// Store every user, then every entry, stopping at the first failure
  pub async fn import(&self, document: ImportDocument) -> Result<ImportReport> {
    let mut report = ImportReport::default();

    for user in &document.users {
      if user.username.trim().is_empty() {
        return Err(MatchError::invalid(format!("user {} has an empty username", user.user_id)));
      }
      self.writer.record_user(user).await.map_err(MatchError::store)?;
      report.users += 1;
    }

    for entry in document.journals {
      let generated = entry.summary.is_none() && entry.consent;
      self.add_entry(entry).await?;
      report.entries += 1;
      if generated {
        report.summarized += 1;
      }
    }

    info!(users = report.users, entries = report.entries, "Imported journal data");
    Ok(report)
  }

  async fn summary_for(&self, entry: &JournalEntry) -> Result<String> {
    if let Some(summary) = &entry.summary {
      let summary = summary.trim();
      if summary.is_empty() {
        return Err(MatchError::invalid("journal summary is empty"));
      }
      return Ok(summary.to_string());
    }

    let content = entry.content.as_deref().map(str::trim).unwrap_or_default();
    if content.is_empty() {
      return Err(MatchError::invalid("journal entry needs content or a summary"));
    }
    if !entry.consent {
      return Ok(String::new());
    }

    let reply = self
      .generator
      .generate(&entry_summary_prompt(content))
      .await
      .map_err(|e| MatchError::upstream("entry summarization", e))?;

    let summary = reply.trim();
    if summary.is_empty() {
      return Err(MatchError::upstream("entry summarization", "empty summary"));
    }
    Ok(summary.to_string())
  }
}

fn entry_summary_prompt(content: &str) -> String {
  format!(
    "Summarize this journal entry in a couple of sentences. Keep its main themes and the \
     first person voice, and leave out names, places and other personal details.\n\n{content}"
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::services::generation::MockTextGenerator;
  use crate::services::memory::MemoryStore;
  use crate::services::stores::{JournalSource, UserDirectory};
  use anyhow::anyhow;

  fn entry(content: Option<&str>, summary: Option<&str>, consent: bool) -> JournalEntry {
    JournalEntry {
      user_id: 4,
      content: content.map(str::to_string),
      summary: summary.map(str::to_string),
      entry_date: Utc::now(),
      consent,
    }
  }

  fn ingest(store: Arc<MemoryStore>, generator: MockTextGenerator) -> JournalIngest {
    JournalIngest::new(store, Arc::new(generator))
  }

  #[tokio::test]
  async fn test_consented_content_is_summarized() {
    let store = Arc::new(MemoryStore::new());
    let mut generator = MockTextGenerator::new();
    generator
      .expect_generate()
      .withf(|prompt: &str| prompt.ends_with("Met Dana at the lake."))
      .times(1)
      .returning(|_| Ok("  I spent a calm afternoon outdoors with a friend. ".to_string()));

    let stored = ingest(store.clone(), generator)
      .add_entry(entry(Some("Met Dana at the lake."), None, true))
      .await
      .unwrap();
    assert_eq!(stored.summary, "I spent a calm afternoon outdoors with a friend.");

    let summaries = store.recent_consented_summaries(4, 5).await.unwrap();
    assert_eq!(summaries, vec![stored]);
  }

  #[tokio::test]
  async fn test_unconsented_content_never_reaches_the_generator() {
    let store = Arc::new(MemoryStore::new());
    let mut generator = MockTextGenerator::new();
    generator.expect_generate().never();

    let stored = ingest(store.clone(), generator)
      .add_entry(entry(Some("Private thoughts."), None, false))
      .await
      .unwrap();
    assert!(stored.summary.is_empty());
    assert!(!stored.consent);
    assert!(store.recent_consented_summaries(4, 5).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_ready_summary_is_stored_as_is() {
    let store = Arc::new(MemoryStore::new());
    let mut generator = MockTextGenerator::new();
    generator.expect_generate().never();

    let stored =
      ingest(store, generator).add_entry(entry(None, Some("A restful week."), true)).await.unwrap();
    assert_eq!(stored.summary, "A restful week.");
  }

  #[tokio::test]
  async fn test_entry_without_text_is_invalid() {
    let mut generator = MockTextGenerator::new();
    generator.expect_generate().never();
    let ingest = ingest(Arc::new(MemoryStore::new()), generator);

    let bad_entries =
      [entry(None, None, true), entry(Some("   "), None, true), entry(None, Some(""), true)];
    for bad in bad_entries {
      let error = ingest.add_entry(bad).await.unwrap_err();
      assert!(matches!(error, MatchError::InvalidRequest { .. }));
    }
  }

  #[tokio::test]
  async fn test_generator_failure_stores_nothing() {
    let store = Arc::new(MemoryStore::new());
    let mut generator = MockTextGenerator::new();
    generator.expect_generate().returning(|_| Err(anyhow!("rate limited")));

    let error = ingest(store.clone(), generator)
      .add_entry(entry(Some("Long day."), None, true))
      .await
      .unwrap_err();
    assert!(matches!(error, MatchError::UpstreamFailure { provider: "entry summarization", .. }));
    assert!(store.recent_consented_summaries(4, 5).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_import_document_counts() {
    let document: ImportDocument = serde_yaml::from_str(
      r#"
users:
  - user_id: 4
    username: dana
journals:
  - user_id: 4
    summary: I finished a hard project.
    entry_date: 2026-03-01T09:00:00Z
    consent: true
  - user_id: 4
    content: Went hiking with my sister.
    consent: true
  - user_id: 4
    content: Not for sharing.
    consent: false
"#,
    )
    .unwrap();

    let store = Arc::new(MemoryStore::new());
    let mut generator = MockTextGenerator::new();
    generator.expect_generate().times(1).returning(|_| Ok("I enjoyed a day outside.".to_string()));

    let report = ingest(store.clone(), generator).import(document).await.unwrap();
    assert_eq!(report, ImportReport { users: 1, entries: 3, summarized: 1 });
    assert_eq!(store.username(4).await.unwrap().as_deref(), Some("dana"));
    assert_eq!(store.recent_consented_summaries(4, 5).await.unwrap().len(), 2);
  }

  #[test]
  fn test_import_document_requires_consent_flag() {
    let parsed = serde_yaml::from_str::<ImportDocument>("journals:\n  - user_id: 1\n    summary: x\n");
    assert!(parsed.is_err());
  }
}
