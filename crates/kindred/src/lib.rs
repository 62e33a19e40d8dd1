//! Kindred: pairs and groups journaling users whose AI insights are close in
//! embedding space.
//!
//! The [`matcher::Matcher`] finds nearest neighbors and writes suggested
//! connections, [`pipeline::InsightPipeline`] produces the insights it reads
//! from journal summaries stored by [`ingest::JournalIngest`], and [`server`]
//! exposes all of it over HTTP.

pub mod commands;
pub mod config;
pub mod error;
pub mod ingest;
pub mod labels;
pub mod lifecycle;
pub mod matcher;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod services;

pub use config::KindredConfig;
pub use error::{MatchError, Result};
pub use ingest::JournalIngest;
pub use matcher::Matcher;
pub use pipeline::InsightPipeline;
