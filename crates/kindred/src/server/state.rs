//! Shared handler state and store wiring

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::config::KindredConfig;
use crate::ingest::JournalIngest;
use crate::matcher::Matcher;
use crate::pipeline::InsightPipeline;
use crate::services::embeddings::{EmbeddingProvider, OpenAiEmbeddings};
use crate::services::generation::{ChatCompletions, TextGenerator};
use crate::services::memory::MemoryStore;
use crate::services::stores::{
  ConnectionStore, InsightStore, JournalSource, JournalWriter, UserDirectory,
};

/// The store handles, all backed by the same database
#[derive(Clone)]
pub struct Stores {
  pub insights: Arc<dyn InsightStore>,
  pub connections: Arc<dyn ConnectionStore>,
  pub users: Arc<dyn UserDirectory>,
  pub journals: Arc<dyn JournalSource>,
  pub writer: Arc<dyn JournalWriter>,
  pub backend: &'static str,
}

impl Stores {
  pub fn memory(store: Arc<MemoryStore>) -> Self {
    Self {
      insights: store.clone(),
      connections: store.clone(),
      users: store.clone(),
      journals: store.clone(),
      writer: store,
      backend: "memory",
    }
  }

  /// Open the configured backend
  #[cfg(feature = "lancedb-store")]
  pub async fn open(config: &KindredConfig) -> Result<Self> {
    use crate::services::lancedb::LanceDbStore;

    let store = Arc::new(
      LanceDbStore::open(&config.storage.data_dir, config.storage.embedding_dimension)
        .await
        .context("Failed to open LanceDB store")?,
    );
    Ok(Self {
      insights: store.clone(),
      connections: store.clone(),
      users: store.clone(),
      journals: store.clone(),
      writer: store,
      backend: "lancedb",
    })
  }

  #[cfg(not(feature = "lancedb-store"))]
  pub async fn open(_config: &KindredConfig) -> Result<Self> {
    tracing::warn!("Built without lancedb-store; using a non-persistent in-memory store");
    Ok(Self::memory(Arc::new(MemoryStore::new())))
  }
}

#[derive(Clone)]
pub struct AppState {
  pub matcher: Arc<Matcher>,
  pub pipeline: Arc<InsightPipeline>,
  pub ingest: Arc<JournalIngest>,
  pub connections: Arc<dyn ConnectionStore>,
  pub backend: &'static str,
}

impl AppState {
  pub fn new(
    stores: Stores,
    generator: Arc<dyn TextGenerator>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: &KindredConfig,
  ) -> Self {
    let matcher = Matcher::new(
      stores.insights.clone(),
      stores.connections.clone(),
      stores.users.clone(),
      generator.clone(),
      config.matching.clone(),
    );
    let ingest = JournalIngest::new(stores.writer.clone(), generator.clone());
    let pipeline = InsightPipeline::new(
      stores.journals.clone(),
      stores.insights.clone(),
      generator,
      embedder,
      config.summarization.max_entries,
      config.storage.embedding_dimension,
    );

    Self {
      matcher: Arc::new(matcher),
      pipeline: Arc::new(pipeline),
      ingest: Arc::new(ingest),
      connections: stores.connections,
      backend: stores.backend,
    }
  }

  /// Open the configured store and build the OpenAI-compatible providers
  pub async fn from_config(config: &KindredConfig) -> Result<Self> {
    let stores = Stores::open(config).await?;
    let generator = ChatCompletions::from_config(&config.generation)
      .context("Failed to configure generation provider")?;
    let embedder = OpenAiEmbeddings::from_config(&config.embeddings)
      .context("Failed to configure embedding provider")?;

    info!(
      backend = stores.backend,
      generation_model = generator.model(),
      embedding_model = embedder.model(),
      "Initialized application state"
    );
    Ok(Self::new(stores, Arc::new(generator), Arc::new(embedder), config))
  }
}
