//! Embedding provider seam and its OpenAI-compatible implementation

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::openai::OpenAiClient;
use crate::config::ProviderConfig;

/// Converts text into a fixed-length vector
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
  async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
  model: &'a str,
  input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
  data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
  embedding: Vec<f32>,
}

/// `POST {base_url}/embeddings` client
pub struct OpenAiEmbeddings {
  client: OpenAiClient,
  model: String,
}

impl OpenAiEmbeddings {
  pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
    Self { client, model: model.into() }
  }

  pub fn from_config(config: &ProviderConfig) -> Result<Self> {
    Ok(Self::new(OpenAiClient::from_config(config)?, config.model.clone()))
  }

  pub fn model(&self) -> &str {
    &self.model
  }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
  async fn embed(&self, text: &str) -> Result<Vec<f32>> {
    let request = EmbeddingRequest { model: &self.model, input: text };
    let response: EmbeddingResponse = self.client.post_json("embeddings", &request).await?;

    let embedding = response
      .data
      .into_iter()
      .next()
      .map(|d| d.embedding)
      .ok_or_else(|| anyhow!("No embeddings returned from provider"))?;

    debug!(model = %self.model, dimension = embedding.len(), "Generated embedding");
    Ok(embedding)
  }
}
