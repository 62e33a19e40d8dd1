//! Text generation seam and its chat-completions implementation

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::openai::OpenAiClient;
use crate::config::ProviderConfig;

/// Sends one prompt, returns the model's reply
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
  async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
  role: &'a str,
  content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
  choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
  message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
  #[serde(default)]
  content: Option<String>,
}

/// `POST {base_url}/chat/completions` client sending a single user message
pub struct ChatCompletions {
  client: OpenAiClient,
  model: String,
}

impl ChatCompletions {
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
impl TextGenerator for ChatCompletions {
  async fn generate(&self, prompt: &str) -> Result<String> {
    let request = ChatRequest {
      model: &self.model,
      messages: vec![ChatMessage { role: "user", content: prompt }],
    };
    let response: ChatResponse = self.client.post_json("chat/completions", &request).await?;

    let content = response
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .ok_or_else(|| anyhow!("Provider returned no completion"))?;

    debug!(model = %self.model, chars = content.len(), "Received completion");
    Ok(content.trim().to_string())
  }
}
