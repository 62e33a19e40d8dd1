use anyhow::Result;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

use kindred::config::{kindred_home, KindredConfig};

fn write_config(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
  let path = dir.path().join(name);
  fs::write(&path, content).unwrap();
  path
}

#[test]
fn test_explicit_file_overrides_defaults() -> Result<()> {
  let dir = TempDir::new()?;
  let path = write_config(
    &dir,
    "kindred.yaml",
    r#"
server:
  bind: "0.0.0.0:8080"
storage:
  data_dir: /var/lib/kindred
  embedding_dimension: 768
embeddings:
  base_url: http://localhost:11434/v1
  model: nomic-embed-text
matching:
  pair_threshold: 0.5
  default_group_label: Fellow Travelers
"#,
  );

  let config = KindredConfig::load(Some(&path))?;
  assert_eq!(config.server.bind.port(), 8080);
  assert_eq!(config.storage.embedding_dimension, 768);
  assert_eq!(config.embeddings.model, "nomic-embed-text");
  assert_eq!(config.embeddings.api_key_env, "OPENAI_API_KEY");
  assert_eq!(config.generation.model, "gpt-4o-mini");
  assert_eq!(config.matching.pair_threshold, 0.5);
  assert_eq!(config.matching.default_group_label, "Fellow Travelers");
  assert_eq!(config.matching.group_k, 5);
  Ok(())
}

#[test]
fn test_invalid_file_names_the_path() -> Result<()> {
  let dir = TempDir::new()?;
  let path = write_config(&dir, "bad.yaml", "storage:\n  embedding_dimension: 0\n");

  let error = KindredConfig::load(Some(&path)).unwrap_err();
  let message = format!("{error:#}");
  assert!(message.contains("bad.yaml"));
  assert!(message.contains("embedding_dimension"));
  Ok(())
}

#[test]
fn test_missing_explicit_file_is_an_error() {
  let dir = TempDir::new().unwrap();
  assert!(KindredConfig::load(Some(&dir.path().join("absent.yaml"))).is_err());
}

#[test]
#[serial]
fn test_home_config_is_used_when_present() -> Result<()> {
  let home = TempDir::new()?;
  let original_home = env::var("HOME").ok();
  env::set_var("HOME", home.path());

  fs::create_dir_all(kindred_home())?;
  fs::write(kindred_home().join("config.yaml"), "matching:\n  group_k: 8\n")?;
  let config = KindredConfig::load(None);

  match original_home {
    Some(value) => env::set_var("HOME", value),
    None => env::remove_var("HOME"),
  }

  assert_eq!(config?.matching.group_k, 8);
  Ok(())
}

#[test]
#[serial]
fn test_defaults_without_home_config() -> Result<()> {
  let home = TempDir::new()?;
  let original_home = env::var("HOME").ok();
  env::set_var("HOME", home.path());

  let config = KindredConfig::load(None);
  let data_dir = kindred_home().join("lancedb");

  match original_home {
    Some(value) => env::set_var("HOME", value),
    None => env::remove_var("HOME"),
  }

  let config = config?;
  assert_eq!(config.storage.data_dir, data_dir);
  assert_eq!(config.server.bind.port(), 5000);
  Ok(())
}
