//! Insight generation: consented journal summaries -> insight text -> embedding
//!
//! This is the upstream producer of the insights the matcher reads. It never
//! touches existing insights; every refresh appends a new one.

use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::{MatchError, Result};
use crate::models::{Insight, UserId};
use crate::services::embeddings::EmbeddingProvider;
use crate::services::generation::TextGenerator;
use crate::services::stores::{InsightStore, JournalSource};

const KEYWORDS_PREFIX: &str = "keywords:";

/// Result of one pipeline run
#[derive(Debug, Clone)]
pub struct GeneratedInsight {
  pub insight: Insight,
  pub keywords: Vec<String>,
  /// Number of journal summaries that fed the insight
  pub entries_used: usize,
}

pub struct InsightPipeline {
  journals: Arc<dyn JournalSource>,
  insights: Arc<dyn InsightStore>,
  generator: Arc<dyn TextGenerator>,
  embedder: Arc<dyn EmbeddingProvider>,
  max_entries: usize,
  embedding_dimension: usize,
}

impl InsightPipeline {
  pub fn new(
    journals: Arc<dyn JournalSource>,
    insights: Arc<dyn InsightStore>,
    generator: Arc<dyn TextGenerator>,
    embedder: Arc<dyn EmbeddingProvider>,
    max_entries: usize,
    embedding_dimension: usize,
  ) -> Self {
    Self { journals, insights, generator, embedder, max_entries, embedding_dimension }
  }

  /// Generate and store a fresh insight for `user_id`
  #[instrument(skip(self))]
  pub async fn refresh(&self, user_id: UserId) -> Result<GeneratedInsight> {
    let summaries = self
      .journals
      .recent_consented_summaries(user_id, self.max_entries)
      .await
      .map_err(MatchError::store)?;

    if summaries.is_empty() {
      return Err(MatchError::NoJournalEntries { user_id });
    }

    let combined = summaries.iter().map(|s| s.summary.trim()).collect::<Vec<_>>().join(" ");
    let reply = self
      .generator
      .generate(&insight_prompt(&combined))
      .await
      .map_err(|e| MatchError::upstream("insight generation", e))?;

    let (text, keywords) = split_keywords(&reply);
    if text.is_empty() {
      return Err(MatchError::upstream("insight generation", "empty insight text"));
    }

    let embedding =
      self.embedder.embed(&text).await.map_err(|e| MatchError::upstream("embedding", e))?;
    if embedding.len() != self.embedding_dimension {
      return Err(MatchError::upstream(
        "embedding",
        format!("expected {} dimensions, got {}", self.embedding_dimension, embedding.len()),
      ));
    }

    let insight = Insight::new(user_id, text, embedding);
    self.insights.append(&insight).await.map_err(MatchError::store)?;

    info!(user_id, entries = summaries.len(), keywords = keywords.len(), "Stored new insight");
    Ok(GeneratedInsight { insight, keywords, entries_used: summaries.len() })
  }
}

fn insight_prompt(combined_summaries: &str) -> String {
  format!(
    "Read these journal entry summaries, newest first, and describe the writer's recurring \
     thoughts, emotional trends and signs of personal growth. Keep it to one paragraph and \
     leave out names, places and other identifying details. You may end with a line of the \
     form 'Keywords: word, word, word'.\n\n{combined_summaries}"
  )
}

/// Split an optional trailing `Keywords:` line off the generated paragraph
fn split_keywords(reply: &str) -> (String, Vec<String>) {
  let lines: Vec<&str> = reply.trim().lines().collect();

  let keyword_line = lines.iter().enumerate().rev().find_map(|(index, line)| {
    keyword_list(line.trim()).map(|list| (index, list))
  });

  match keyword_line {
    Some((index, list)) => {
      let keywords = list
        .split(',')
        .map(|k| k.trim().trim_end_matches('.').to_string())
        .filter(|k| !k.is_empty())
        .collect();
      let text = lines[..index].join("\n").trim().to_string();
      (text, keywords)
    }
    None => (reply.trim().to_string(), Vec::new()),
  }
}

/// Text after a leading ASCII case-insensitive `Keywords:` prefix
fn keyword_list(line: &str) -> Option<&str> {
  let prefix = line.get(..KEYWORDS_PREFIX.len())?;
  if prefix.eq_ignore_ascii_case(KEYWORDS_PREFIX) {
    line.get(KEYWORDS_PREFIX.len()..)
  } else {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::JournalSummary;
  use crate::services::embeddings::MockEmbeddingProvider;
  use crate::services::generation::MockTextGenerator;
  use crate::services::memory::MemoryStore;
  use anyhow::anyhow;
  use chrono::{Duration, Utc};

  fn store_with_entries(count: i64) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let now = Utc::now();
    for day in 0..count {
      store
        .add_journal(JournalSummary {
          user_id: 1,
          summary: format!("entry {day}"),
          entry_date: now - Duration::days(day),
          consent: day != 1,
        })
        .unwrap();
    }
    store
  }

  fn pipeline(
    store: Arc<MemoryStore>,
    generator: MockTextGenerator,
    embedder: MockEmbeddingProvider,
  ) -> InsightPipeline {
    InsightPipeline::new(store.clone(), store, Arc::new(generator), Arc::new(embedder), 5, 3)
  }

  #[test]
  fn test_split_keywords_trailing_line() {
    let (text, keywords) = split_keywords("Feels stretched thin.\nKeywords: stress, friends, balance.");
    assert_eq!(text, "Feels stretched thin.");
    assert_eq!(keywords, vec!["stress", "friends", "balance"]);
  }

  #[test]
  fn test_split_keywords_ignores_case() {
    let (text, keywords) = split_keywords("Rests more.\nKEYWORDS: sleep");
    assert_eq!(text, "Rests more.");
    assert_eq!(keywords, vec!["sleep"]);
  }

  #[test]
  fn test_split_keywords_non_ascii_line_is_left_alone() {
    // U+212A KELVIN SIGN lowercases to 'k' and is three bytes long
    let reply = "Warm days.\n\u{212A}eywords: heat";
    let (text, keywords) = split_keywords(reply);
    assert_eq!(text, reply);
    assert!(keywords.is_empty());

    let (text, keywords) = split_keywords("Calm.\nKeywords:");
    assert_eq!(text, "Calm.");
    assert!(keywords.is_empty());
  }

  #[test]
  fn test_split_keywords_absent() {
    let (text, keywords) = split_keywords("  Just one paragraph.  ");
    assert_eq!(text, "Just one paragraph.");
    assert!(keywords.is_empty());
  }

  #[tokio::test]
  async fn test_refresh_uses_five_newest_consented_entries() {
    let store = store_with_entries(8);
    let mut generator = MockTextGenerator::new();
    generator
      .expect_generate()
      .withf(|prompt: &str| {
        prompt.ends_with("entry 0 entry 2 entry 3 entry 4 entry 5") && !prompt.contains("entry 1 ")
      })
      .times(1)
      .returning(|_| Ok("Grows more confident.\nKeywords: growth".to_string()));
    let mut embedder = MockEmbeddingProvider::new();
    embedder
      .expect_embed()
      .withf(|text: &str| text == "Grows more confident.")
      .times(1)
      .returning(|_| Ok(vec![0.1, 0.2, 0.3]));

    let generated = pipeline(store.clone(), generator, embedder).refresh(1).await.unwrap();
    assert_eq!(generated.entries_used, 5);
    assert_eq!(generated.keywords, vec!["growth"]);
    assert_eq!(store.insights().unwrap(), vec![generated.insight]);
  }

  #[tokio::test]
  async fn test_refresh_without_entries() {
    let store = Arc::new(MemoryStore::new());
    let mut generator = MockTextGenerator::new();
    generator.expect_generate().never();
    let mut embedder = MockEmbeddingProvider::new();
    embedder.expect_embed().never();

    let error = pipeline(store, generator, embedder).refresh(1).await.unwrap_err();
    assert!(matches!(error, MatchError::NoJournalEntries { user_id: 1 }));
  }

  #[tokio::test]
  async fn test_dimension_mismatch_writes_nothing() {
    let store = store_with_entries(2);
    let mut generator = MockTextGenerator::new();
    generator.expect_generate().returning(|_| Ok("Paragraph.".to_string()));
    let mut embedder = MockEmbeddingProvider::new();
    embedder.expect_embed().returning(|_| Ok(vec![0.1, 0.2]));

    let error = pipeline(store.clone(), generator, embedder).refresh(1).await.unwrap_err();
    assert!(matches!(error, MatchError::UpstreamFailure { provider: "embedding", .. }));
    assert!(store.insights().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_embedding_failure_is_upstream() {
    let store = store_with_entries(1);
    let mut generator = MockTextGenerator::new();
    generator.expect_generate().returning(|_| Ok("Paragraph.".to_string()));
    let mut embedder = MockEmbeddingProvider::new();
    embedder.expect_embed().returning(|_| Err(anyhow!("timeout")));

    let error = pipeline(store.clone(), generator, embedder).refresh(1).await.unwrap_err();
    assert!(matches!(error, MatchError::UpstreamFailure { .. }));
    assert!(store.insights().unwrap().is_empty());
  }
}
