//! Sitemap index resolution.
//!
//! Turns a root sitemap URL into the flat, de-duplicated list of page URLs it
//! (transitively) references. Sitemap indexes may point at each other in
//! cycles; a visited set guarantees each sitemap is fetched at most once.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use doccrawl_discovery::{SitemapDocument, parse_sitemap};
use doccrawl_shared::{Result, SitemapConfig};

use crate::fetch::{Fetcher, FetcherConfig, RetryPolicy};

/// Resolves sitemap indexes into page URLs.
#[derive(Debug, Clone)]
pub struct SitemapResolver {
    fetcher: Fetcher,
}

impl SitemapResolver {
    /// Build a resolver from the `[sitemap]` config section.
    pub fn new(config: &SitemapConfig) -> Result<Self> {
        Ok(Self {
            fetcher: sitemap_fetcher(config)?,
        })
    }

    /// All page URLs reachable from `root`, in discovery order, without duplicates.
    pub async fn resolve(&self, root: &str) -> Vec<String> {
        let mut visited = HashSet::new();
        self.resolve_with(root, &mut visited).await
    }

    /// Like [`resolve`](Self::resolve), sharing `visited` with the caller.
    ///
    /// URLs already in `visited` are not fetched. Every sitemap fetched here
    /// is added to it, including ones that turn out to be unreachable.
    #[instrument(skip_all, fields(root = %root))]
    pub async fn resolve_with(&self, root: &str, visited: &mut HashSet<String>) -> Vec<String> {
        let mut pages = Vec::new();
        let mut seen_pages = HashSet::new();
        let mut stack = vec![vec![root.to_string()].into_iter()];

        while let Some(pending) = stack.last_mut() {
            let Some(url) = pending.next() else {
                stack.pop();
                continue;
            };

            if !visited.insert(url.clone()) {
                debug!(%url, "sitemap already visited, skipping");
                continue;
            }

            let depth = stack.len() - 1;
            match self.fetch_document(&url).await {
                Some(SitemapDocument::Index(children)) => {
                    debug!(%url, depth, children = children.len(), "sitemap index");
                    stack.push(children.into_iter());
                }
                Some(SitemapDocument::UrlSet(locs)) => {
                    debug!(%url, depth, pages = locs.len(), "leaf sitemap");
                    for loc in locs {
                        if seen_pages.insert(loc.clone()) {
                            pages.push(loc);
                        }
                    }
                }
                None => {}
            }
        }

        info!(pages = pages.len(), sitemaps = visited.len(), "resolved sitemap");
        pages
    }

    /// Fetch and parse one sitemap. `None` abandons that subtree.
    async fn fetch_document(&self, url: &str) -> Option<SitemapDocument> {
        let response = match self.fetcher.fetch(url).await {
            Ok(response) => response,
            Err(e) => {
                warn!(%url, error = %e, "could not fetch sitemap, skipping");
                return None;
            }
        };

        match parse_sitemap(&response.body) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(%url, error = %e, "could not parse sitemap, skipping");
                None
            }
        }
    }
}

/// Fetcher for sitemap and page requests: custom user agent, nothing else.
pub(crate) fn sitemap_fetcher(config: &SitemapConfig) -> Result<Fetcher> {
    Fetcher::new(FetcherConfig {
        user_agent: config.user_agent.clone(),
        timeout: Duration::from_secs(config.timeout_secs),
        headers: Vec::new(),
        retry: RetryPolicy {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.retry_delay_ms),
        },
    })
}
