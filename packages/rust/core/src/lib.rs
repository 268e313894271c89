//! Orchestration for doccrawl.
//!
//! This crate ties knowledge-file reading, the GitHub and sitemap traversers,
//! and the combined output file into one sequential run over every
//! configured documentation source.

pub mod output;
pub mod pipeline;

pub use output::{OUTPUT_FILE_NAME, OutputHeader, OutputWriter, group_name, output_path};
pub use pipeline::{RunSummary, SourceReport, SourceStatus, run};
