//! Network side of doccrawl.
//!
//! This crate provides:
//! - [`fetch`]: single-URL GET with bounded retries and rate-limit handling
//! - [`github`]: depth-first walk over GitHub contents API listings
//! - [`sitemap`]: sitemap index resolution with a visited set
//! - [`engine`]: sequential page fetching and HTML-to-Markdown conversion
//!
//! Everything here runs one request at a time.

pub mod engine;
pub mod fetch;
pub mod github;
pub mod sitemap;

pub use engine::{PageCrawlResult, PageCrawler};
pub use fetch::{FetchedResponse, Fetcher, FetcherConfig, RetryPolicy};
pub use github::{ContentEntry, EntryKind, GithubCrawler, TreeStats, parse_listing};
pub use sitemap::SitemapResolver;
