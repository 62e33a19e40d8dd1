//! Storage backends and external providers

pub mod embeddings;
pub mod generation;
#[cfg(feature = "lancedb-store")]
pub mod lancedb;
pub mod memory;
pub mod openai;
pub mod stores;

pub use embeddings::{EmbeddingProvider, OpenAiEmbeddings};
pub use generation::{ChatCompletions, TextGenerator};
pub use memory::MemoryStore;
pub use stores::{ConnectionStore, InsightStore, JournalSource, UserDirectory};
