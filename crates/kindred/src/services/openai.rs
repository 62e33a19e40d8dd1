//! Minimal client for OpenAI-compatible HTTP APIs (OpenAI, Together, local gateways)

use anyhow::{anyhow, Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::config::ProviderConfig;

#[derive(Clone)]
pub struct OpenAiClient {
  http: reqwest::Client,
  base_url: Url,
  api_key: Option<String>,
}

impl OpenAiClient {
  pub fn new(base_url: Url, api_key: Option<String>) -> Self {
    Self { http: reqwest::Client::new(), base_url, api_key }
  }

  /// Build a client from provider config, reading the key from the configured env var.
  ///
  /// A missing key is allowed so keyless local gateways keep working.
  pub fn from_config(config: &ProviderConfig) -> Result<Self> {
    let base_url = Url::parse(&ensure_trailing_slash(&config.base_url))
      .with_context(|| format!("Invalid provider base URL '{}'", config.base_url))?;
    let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.trim().is_empty());

    if api_key.is_none() {
      tracing::warn!(env = %config.api_key_env, "No API key set for provider at {base_url}");
    }

    Ok(Self::new(base_url, api_key))
  }

  /// POST a JSON body to `path` (relative to the base URL) and decode the JSON reply
  pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
  where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
  {
    let url = self.base_url.join(path).with_context(|| format!("Invalid endpoint path '{path}'"))?;

    let mut request = self.http.post(url.clone()).json(body);
    if let Some(key) = &self.api_key {
      request = request.bearer_auth(key);
    }

    let response = request.send().await.with_context(|| format!("Request to {url} failed"))?;
    let status = response.status();

    if !status.is_success() {
      return Err(anyhow!("{url} returned {status}: {}", describe_body(response.text().await)));
    }

    response.json::<R>().await.with_context(|| format!("Invalid JSON from {url}"))
  }
}

fn ensure_trailing_slash(url: &str) -> String {
  if url.ends_with('/') {
    url.to_string()
  } else {
    format!("{url}/")
  }
}

/// Error body text for a failed call, or why it could not be read
fn describe_body<E: std::fmt::Display>(body: std::result::Result<String, E>) -> String {
  match body {
    Ok(text) if text.trim().is_empty() => "<empty body>".to_string(),
    Ok(text) => truncate(&text, 300),
    Err(e) => format!("<body unreadable: {e}>"),
  }
}

fn truncate(text: &str, max_chars: usize) -> String {
  match text.char_indices().nth(max_chars) {
    Some((idx, _)) => format!("{}...", &text[..idx]),
    None => text.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_base_url_keeps_path_prefix_when_joining() {
    let base = Url::parse(&ensure_trailing_slash("https://api.openai.com/v1")).unwrap();
    assert_eq!(base.join("embeddings").unwrap().as_str(), "https://api.openai.com/v1/embeddings");
  }

  #[test]
  fn test_truncate_is_char_safe() {
    assert_eq!(truncate("héllo", 2), "hé...");
    assert_eq!(truncate("short", 10), "short");
  }

  #[test]
  fn test_unreadable_error_body_is_reported() {
    let described = describe_body::<String>(Err("connection closed mid-body".to_string()));
    assert_eq!(described, "<body unreadable: connection closed mid-body>");
    assert_eq!(describe_body::<String>(Ok("  ".to_string())), "<empty body>");
    assert_eq!(describe_body::<String>(Ok("rate limited".to_string())), "rate limited");
  }
}
