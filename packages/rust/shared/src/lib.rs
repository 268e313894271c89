//! Shared types, error model, and configuration for doccrawl.
//!
//! This crate is the foundation depended on by all other doccrawl crates.
//! It provides:
//! - [`DocCrawlError`], the unified error type
//! - Domain types ([`Document`], [`SourceKind`], [`DocumentSink`])
//! - Configuration ([`AppConfig`], config loading)
//! - Progress reporting ([`ProgressReporter`])

pub mod config;
pub mod error;
pub mod progress;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, GithubConfig, SitemapConfig, SourceEntry, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{DocCrawlError, Result};
pub use progress::{ProgressReporter, SilentProgress};
pub use types::{Document, DocumentSink, DocumentSource, SourceKind};
