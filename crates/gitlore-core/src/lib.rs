//! Core types, configuration, and error handling for gitlore.
//!
//! This crate provides the shared foundation used by the mining engine
//! and the CLI:
//! - [`GitloreError`]: unified error type using `thiserror`
//! - [`GitloreConfig`]: configuration loaded from `.gitlore.toml`
//! - [`OutputFormat`]: how the CLI renders an analysis

mod config;
mod error;
mod types;

pub use config::{
    AuthorConfig, CohortStrategy, GitloreConfig, HotspotConfig, StatsConfig, WalkConfig,
};
pub use error::GitloreError;
pub use types::OutputFormat;

/// A convenience `Result` type for gitlore operations.
pub type Result<T> = std::result::Result<T, GitloreError>;
