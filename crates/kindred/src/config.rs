//! Configuration management for Kindred
//!
//! Loads the YAML config file (or defaults), then validates the matching
//! parameters before anything is wired up.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KindredConfig {
  pub server: ServerConfig,
  pub storage: StorageConfig,
  pub embeddings: ProviderConfig,
  pub generation: ProviderConfig,
  pub matching: MatchSettings,
  pub summarization: SummarizationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub bind: SocketAddr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
  /// LanceDB data directory
  pub data_dir: PathBuf,
  /// Vector length produced by the embedding model; fixed per deployment
  pub embedding_dimension: usize,
}

/// OpenAI-compatible provider endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
  pub base_url: String,
  pub model: String,
  /// Name of the environment variable holding the API key
  #[serde(default = "default_api_key_env")]
  pub api_key_env: String,
}

/// Matching thresholds and candidate counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
  pub pair_k: usize,
  pub pair_threshold: f32,
  pub group_k: usize,
  pub group_threshold: f32,
  /// Fewest candidates that still count as a group; a group of one is a pair
  pub min_group_size: usize,
  pub default_group_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizationConfig {
  /// How many recent consented journal summaries feed one insight
  pub max_entries: usize,
}

// Default values
// ==============

const DEFAULT_PORT: u16 = 5000;
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

fn default_api_key_env() -> String {
  "OPENAI_API_KEY".to_string()
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self { bind: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)) }
  }
}

impl Default for StorageConfig {
  fn default() -> Self {
    Self { data_dir: kindred_home().join("lancedb"), embedding_dimension: 1536 }
  }
}

impl ProviderConfig {
  pub fn embeddings() -> Self {
    Self {
      base_url: OPENAI_BASE_URL.to_string(),
      model: "text-embedding-3-small".to_string(),
      api_key_env: default_api_key_env(),
    }
  }

  pub fn generation() -> Self {
    Self {
      base_url: OPENAI_BASE_URL.to_string(),
      model: "gpt-4o-mini".to_string(),
      api_key_env: default_api_key_env(),
    }
  }
}

impl Default for KindredConfig {
  fn default() -> Self {
    Self::defaults()
  }
}

impl Default for MatchSettings {
  fn default() -> Self {
    Self {
      pair_k: 1,
      pair_threshold: 0.7,
      group_k: 5,
      group_threshold: 0.7,
      min_group_size: 2,
      default_group_label: "Kindred Circle".to_string(),
    }
  }
}

impl Default for SummarizationConfig {
  fn default() -> Self {
    Self { max_entries: 5 }
  }
}

/// `~/.kindred`, or `/tmp/.kindred` when no home directory is known
pub fn kindred_home() -> PathBuf {
  dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp")).join(".kindred")
}

// Loading
// =======

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawConfig {
  server: Option<ServerConfig>,
  storage: Option<StorageConfig>,
  embeddings: Option<ProviderConfig>,
  generation: Option<ProviderConfig>,
  matching: Option<MatchSettings>,
  summarization: Option<SummarizationConfig>,
}

impl From<RawConfig> for KindredConfig {
  fn from(raw: RawConfig) -> Self {
    Self {
      server: raw.server.unwrap_or_default(),
      storage: raw.storage.unwrap_or_default(),
      embeddings: raw.embeddings.unwrap_or_else(ProviderConfig::embeddings),
      generation: raw.generation.unwrap_or_else(ProviderConfig::generation),
      matching: raw.matching.unwrap_or_default(),
      summarization: raw.summarization.unwrap_or_default(),
    }
  }
}

impl KindredConfig {
  /// Load and validate configuration from a YAML file
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read config file {}", path.display()))?;
    Self::from_yaml(&content).with_context(|| format!("Invalid config file {}", path.display()))
  }

  pub fn from_yaml(content: &str) -> Result<Self> {
    let raw: RawConfig =
      if content.trim().is_empty() { RawConfig::default() } else { serde_yaml::from_str(content)? };
    let config = KindredConfig::from(raw);
    config.validate()?;
    Ok(config)
  }

  /// Explicit path, else `~/.kindred/config.yaml` if present, else defaults
  pub fn load(explicit: Option<&Path>) -> Result<Self> {
    if let Some(path) = explicit {
      return Self::load_from_file(path);
    }

    let default_path = kindred_home().join("config.yaml");
    if default_path.exists() {
      return Self::load_from_file(default_path);
    }

    let config = Self::defaults();
    config.validate()?;
    Ok(config)
  }

  pub fn defaults() -> Self {
    KindredConfig::from(RawConfig::default())
  }

  /// Reject settings the matcher cannot honor
  pub fn validate(&self) -> Result<()> {
    self.matching.validate()?;

    if self.storage.embedding_dimension == 0 {
      bail!("storage.embedding_dimension must be greater than 0");
    }
    if self.summarization.max_entries == 0 {
      bail!("summarization.max_entries must be greater than 0");
    }
    Ok(())
  }
}

impl MatchSettings {
  pub fn validate(&self) -> Result<()> {
    if self.pair_k == 0 || self.group_k == 0 {
      bail!("matching.pair_k and matching.group_k must be greater than 0");
    }
    validate_threshold("matching.pair_threshold", self.pair_threshold)?;
    validate_threshold("matching.group_threshold", self.group_threshold)?;

    if self.min_group_size < 2 {
      bail!("matching.min_group_size must be at least 2");
    }
    if self.group_k < self.min_group_size {
      bail!(
        "matching.group_k ({}) can never reach matching.min_group_size ({})",
        self.group_k,
        self.min_group_size
      );
    }
    if self.default_group_label.trim().is_empty() {
      bail!("matching.default_group_label must not be empty");
    }
    Ok(())
  }
}

pub(crate) fn validate_threshold(name: &str, value: f32) -> Result<()> {
  if !value.is_finite() || value <= 0.0 {
    bail!("{name} must be a positive finite distance, got {value}");
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_carry_original_matching_values() {
    let config = KindredConfig::defaults();
    assert_eq!(config.matching.group_k, 5);
    assert_eq!(config.matching.group_threshold, 0.7);
    assert_eq!(config.matching.pair_k, 1);
    assert_eq!(config.summarization.max_entries, 5);
    assert_eq!(config.embeddings.model, "text-embedding-3-small");
    assert_eq!(config.generation.model, "gpt-4o-mini");
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_partial_yaml_keeps_other_defaults() {
    let config = KindredConfig::from_yaml(
      r#"
matching:
  group_threshold: 0.9
storage:
  embedding_dimension: 768
"#,
    )
    .unwrap();

    assert_eq!(config.matching.group_threshold, 0.9);
    assert_eq!(config.matching.group_k, 5);
    assert_eq!(config.storage.embedding_dimension, 768);
    assert_eq!(config.embeddings.model, "text-embedding-3-small");
  }

  #[test]
  fn test_group_minimum_below_two_is_rejected() {
    let result = KindredConfig::from_yaml("matching:\n  min_group_size: 1\n");
    assert!(result.is_err());
    assert!(format!("{:#}", result.unwrap_err()).contains("at least 2"));
  }

  #[test]
  fn test_non_positive_threshold_is_rejected() {
    let mut settings = MatchSettings::default();
    settings.pair_threshold = 0.0;
    assert!(settings.validate().is_err());

    settings.pair_threshold = f32::NAN;
    assert!(settings.validate().is_err());
  }

  #[test]
  fn test_zero_k_is_rejected() {
    let settings = MatchSettings { group_k: 0, ..MatchSettings::default() };
    assert!(settings.validate().is_err());
  }
}
