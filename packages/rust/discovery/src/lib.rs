//! Knowledge-file reading and sitemap document parsing.
//!
//! A knowledge file is a small text file naming the crawl root(s) for one
//! documentation set. GitHub-backed sets list one contents API URL per line;
//! sitemap-backed sets name a single sitemap URL. Blank lines and lines
//! starting with `#` are ignored in both.

mod parser;

use std::path::Path;

use doccrawl_shared::{DocCrawlError, Result};
use tracing::{instrument, warn};
use url::Url;

pub use parser::{SITEMAP_NS, SitemapDocument, parse_sitemap};

/// Expected prefix for GitHub contents API locators.
pub const GITHUB_API_PREFIX: &str = "https://api.github.com/repos/";

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Read every root API URL from a GitHub knowledge file.
///
/// Locators that do not look like contents API URLs are kept, with a warning.
/// Fails only when the file is missing or unreadable.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_github_roots(path: &Path) -> Result<Vec<String>> {
    let content = read_knowledge_file(path)?;

    let mut roots = Vec::new();
    for (line_no, locator) in locator_lines(&content) {
        if !locator.starts_with(GITHUB_API_PREFIX) {
            warn!(
                line = line_no,
                %locator,
                "locator does not look like a GitHub API contents URL"
            );
        }
        roots.push(locator.to_string());
    }

    if roots.is_empty() {
        warn!("no valid URLs found in knowledge file");
    }

    Ok(roots)
}

/// Read the sitemap root URL from a sitemap knowledge file.
///
/// Only the first locator line counts; anything after it is ignored.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_sitemap_root(path: &Path) -> Result<Option<String>> {
    let content = read_knowledge_file(path)?;

    let Some((line_no, locator)) = locator_lines(&content).next() else {
        warn!("knowledge file has no sitemap URL");
        return Ok(None);
    };

    if !is_http_url(locator) {
        warn!(
            line = line_no,
            %locator,
            "sitemap locator does not look like an HTTP(S) URL"
        );
    }

    Ok(Some(locator.to_string()))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_knowledge_file(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(DocCrawlError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "knowledge file not found"),
        ));
    }
    std::fs::read_to_string(path).map_err(|e| DocCrawlError::io(path, e))
}

/// Non-blank, non-comment lines, trimmed, with 1-based line numbers.
fn locator_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

fn is_http_url(locator: &str) -> bool {
    Url::parse(locator)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}
