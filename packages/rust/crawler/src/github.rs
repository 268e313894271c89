//! GitHub contents API tree traversal.
//!
//! Walks a repository directory depth-first in listing order, downloading
//! every `.md` file and handing it to a [`DocumentSink`] as soon as it
//! arrives. Directories are followed through their contents API URL; other
//! entry types are ignored.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use doccrawl_shared::{
    DocCrawlError, Document, DocumentSink, GithubConfig, ProgressReporter, Result,
};

use crate::fetch::{Fetcher, FetcherConfig, RetryPolicy};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

// ---------------------------------------------------------------------------
// API payloads
// ---------------------------------------------------------------------------

/// Entry type as reported by the contents API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    /// `symlink`, `submodule`, or anything newer.
    #[serde(other)]
    #[default]
    Other,
}

/// One item of a directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type", default)]
    pub kind: EntryKind,
    /// Raw content URL (files only).
    #[serde(default)]
    pub download_url: Option<String>,
    /// Contents API URL for this entry (used to descend into directories).
    #[serde(default)]
    pub url: Option<String>,
}

impl ContentEntry {
    fn is_markdown(&self) -> bool {
        self.kind == EntryKind::File && self.name.ends_with(".md")
    }
}

/// A contents API response: a directory listing, or a single file object
/// when the URL points straight at a file.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing {
    Many(Vec<ContentEntry>),
    Single(ContentEntry),
}

/// Parse a contents API body into a list of entries.
///
/// A single `.md` file object is treated as a one-element listing.
pub fn parse_listing(body: &str) -> Result<Vec<ContentEntry>> {
    let listing: Listing = serde_json::from_str(body)
        .map_err(|e| DocCrawlError::malformed(format!("invalid contents listing: {e}")))?;

    match listing {
        Listing::Many(entries) => Ok(entries),
        Listing::Single(entry) if entry.is_markdown() => Ok(vec![entry]),
        Listing::Single(entry) => Err(DocCrawlError::malformed(format!(
            "expected a directory listing or a Markdown file, got {:?} entry {}",
            entry.kind, entry.path
        ))),
    }
}

// ---------------------------------------------------------------------------
// TreeStats
// ---------------------------------------------------------------------------

/// Counters for one root traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Listings fetched and parsed.
    pub listings: usize,
    /// Listings that could not be fetched or parsed.
    pub listings_failed: usize,
    /// `.md` files found in listings.
    pub files_found: usize,
    /// Files downloaded and appended to the sink.
    pub files_written: usize,
    /// Files whose download failed or that had no download URL.
    pub files_failed: usize,
}

impl std::ops::AddAssign for TreeStats {
    fn add_assign(&mut self, other: Self) {
        self.listings += other.listings;
        self.listings_failed += other.listings_failed;
        self.files_found += other.files_found;
        self.files_written += other.files_written;
        self.files_failed += other.files_failed;
    }
}

// ---------------------------------------------------------------------------
// GithubCrawler
// ---------------------------------------------------------------------------

/// Pending entries of one listing, with the depth they were listed at.
struct Frame {
    depth: usize,
    entries: std::vec::IntoIter<ContentEntry>,
}

/// Depth-first walker over GitHub contents API listings.
#[derive(Debug, Clone)]
pub struct GithubCrawler {
    fetcher: Fetcher,
    listing_delay: Duration,
    file_delay: Duration,
}

impl GithubCrawler {
    /// Build a crawler from the `[github]` config section.
    ///
    /// `token`, when present, is sent as a bearer credential and shortens the
    /// pause between listings.
    pub fn new(config: &GithubConfig, token: Option<&str>) -> Result<Self> {
        let mut headers = vec![("Accept".to_string(), GITHUB_ACCEPT.to_string())];
        if let Some(token) = token {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        let fetcher = Fetcher::new(FetcherConfig {
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            headers,
            retry: RetryPolicy {
                max_attempts: config.max_attempts,
                base_delay: Duration::from_millis(config.retry_delay_ms),
            },
        })?;

        Ok(Self {
            listing_delay: config.listing_delay(token.is_some()),
            file_delay: Duration::from_millis(config.file_delay_ms),
            fetcher,
        })
    }

    /// Walk the tree under `root`, appending every Markdown file to `sink`.
    ///
    /// Fetch and parse failures abandon only the affected listing or file.
    /// A sink error stops the walk and is returned.
    #[instrument(skip_all, fields(root = %root))]
    pub async fn crawl(
        &self,
        root: &str,
        sink: &mut dyn DocumentSink,
        progress: &dyn ProgressReporter,
    ) -> Result<TreeStats> {
        let mut stats = TreeStats::default();
        let mut stack: Vec<Frame> = Vec::new();

        if let Some(entries) = self.list(root, 0, &mut stats).await {
            stack.push(Frame {
                depth: 0,
                entries: entries.into_iter(),
            });
        }

        while let Some(frame) = stack.last_mut() {
            let depth = frame.depth;
            let Some(entry) = frame.entries.next() else {
                stack.pop();
                continue;
            };

            match entry.kind {
                EntryKind::File if entry.is_markdown() => {
                    stats.files_found += 1;
                    self.download(entry, sink, progress, &mut stats).await?;
                }
                EntryKind::Dir => {
                    let Some(url) = entry.url.as_deref() else {
                        warn!(path = %entry.path, "directory entry has no API URL, skipping");
                        continue;
                    };
                    debug!(path = %entry.path, depth = depth + 1, "descending into directory");
                    if let Some(entries) = self.list(url, depth + 1, &mut stats).await {
                        stack.push(Frame {
                            depth: depth + 1,
                            entries: entries.into_iter(),
                        });
                    }
                }
                _ => debug!(path = %entry.path, "skipping non-Markdown entry"),
            }
        }

        info!(
            listings = stats.listings,
            files_written = stats.files_written,
            files_failed = stats.files_failed,
            "finished crawl for root"
        );
        Ok(stats)
    }

    /// Fetch and parse one listing. `None` means the node is abandoned.
    async fn list(&self, url: &str, depth: usize, stats: &mut TreeStats) -> Option<Vec<ContentEntry>> {
        debug!(%url, depth, "fetching listing");

        let response = match self.fetcher.fetch(url).await {
            Ok(response) => response,
            Err(e) => {
                warn!(%url, depth, error = %e, "could not fetch listing, skipping subtree");
                stats.listings_failed += 1;
                return None;
            }
        };

        let entries = match parse_listing(&response.body) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(%url, depth, error = %e, "could not parse listing, skipping subtree");
                stats.listings_failed += 1;
                return None;
            }
        };

        stats.listings += 1;
        tokio::time::sleep(self.listing_delay).await;
        Some(entries)
    }

    async fn download(
        &self,
        entry: ContentEntry,
        sink: &mut dyn DocumentSink,
        progress: &dyn ProgressReporter,
        stats: &mut TreeStats,
    ) -> Result<()> {
        let Some(download_url) = entry.download_url.as_deref() else {
            warn!(path = %entry.path, "file entry has no download URL, skipping");
            stats.files_failed += 1;
            return Ok(());
        };

        progress.fetching(download_url, stats.files_found, 0);
        let body = match self.fetcher.fetch(download_url).await {
            Ok(response) => response.body,
            Err(e) => {
                warn!(path = %entry.path, error = %e, "could not download file, skipping");
                stats.files_failed += 1;
                return Ok(());
            }
        };

        sink.append(&Document::repo_file(entry.path.as_str(), body))?;
        stats.files_written += 1;
        progress.document_written(&entry.path);
        info!(path = %entry.path, "appended file");

        tokio::time::sleep(self.file_delay).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doccrawl_shared::SilentProgress;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_config() -> GithubConfig {
        GithubConfig {
            retry_delay_ms: 0,
            listing_delay_ms: 0,
            authenticated_listing_delay_ms: 0,
            file_delay_ms: 0,
            ..GithubConfig::default()
        }
    }

    fn file_entry(server: &MockServer, name: &str, repo_path: &str) -> serde_json::Value {
        serde_json::json!({
            "name": name,
            "path": repo_path,
            "type": "file",
            "download_url": format!("{}/raw/{repo_path}", server.uri()),
            "url": format!("{}/contents/{repo_path}", server.uri()),
        })
    }

    fn dir_entry(server: &MockServer, name: &str, repo_path: &str) -> serde_json::Value {
        serde_json::json!({
            "name": name,
            "path": repo_path,
            "type": "dir",
            "download_url": null,
            "url": format!("{}/contents/{repo_path}", server.uri()),
        })
    }

    async fn mount_json(server: &MockServer, at: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn mount_text(server: &MockServer, at: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[test]
    fn parse_listing_variants() {
        let many = r#"[{"name":"a.md","path":"docs/a.md","type":"file","download_url":"D"}]"#;
        assert_eq!(parse_listing(many).unwrap().len(), 1);

        let single_md = r#"{"name":"README.md","path":"README.md","type":"file","download_url":"D"}"#;
        let entries = parse_listing(single_md).unwrap();
        assert_eq!(entries[0].path, "README.md");

        let single_other = r#"{"name":"logo.png","path":"logo.png","type":"file"}"#;
        assert!(matches!(
            parse_listing(single_other),
            Err(DocCrawlError::Malformed { .. })
        ));

        let symlink = r#"[{"name":"x","path":"x","type":"symlink"}]"#;
        assert_eq!(parse_listing(symlink).unwrap()[0].kind, EntryKind::Other);

        assert!(matches!(
            parse_listing("not json"),
            Err(DocCrawlError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn single_markdown_file_round_trip() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/contents/docs",
            serde_json::json!([file_entry(&server, "a.md", "docs/a.md")]),
        )
        .await;
        mount_text(&server, "/raw/docs/a.md", "# Hello").await;

        let crawler = GithubCrawler::new(&fast_config(), None).unwrap();
        let mut docs: Vec<Document> = Vec::new();
        let stats = crawler
            .crawl(&format!("{}/contents/docs", server.uri()), &mut docs, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(docs, vec![Document::repo_file("docs/a.md", "# Hello")]);
        assert_eq!(stats.files_written, 1);
        assert_eq!(stats.listings, 1);
    }

    #[tokio::test]
    async fn nested_directories_follow_listing_order() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/contents/docs",
            serde_json::json!([
                file_entry(&server, "a.md", "docs/a.md"),
                dir_entry(&server, "guide", "docs/guide"),
                file_entry(&server, "logo.png", "docs/logo.png"),
                file_entry(&server, "z.md", "docs/z.md"),
            ]),
        )
        .await;
        mount_json(
            &server,
            "/contents/docs/guide",
            serde_json::json!([
                file_entry(&server, "b.md", "docs/guide/b.md"),
                dir_entry(&server, "deep", "docs/guide/deep"),
            ]),
        )
        .await;
        mount_json(
            &server,
            "/contents/docs/guide/deep",
            serde_json::json!([file_entry(&server, "c.md", "docs/guide/deep/c.md")]),
        )
        .await;
        for p in ["docs/a.md", "docs/guide/b.md", "docs/guide/deep/c.md", "docs/z.md"] {
            mount_text(&server, &format!("/raw/{p}"), &format!("body of {p}")).await;
        }

        let crawler = GithubCrawler::new(&fast_config(), None).unwrap();
        let mut docs: Vec<Document> = Vec::new();
        let stats = crawler
            .crawl(&format!("{}/contents/docs", server.uri()), &mut docs, &SilentProgress)
            .await
            .unwrap();

        let order: Vec<_> = docs.iter().map(|d| d.source.to_string()).collect();
        assert_eq!(
            order,
            vec![
                "Source: docs/a.md",
                "Source: docs/guide/b.md",
                "Source: docs/guide/deep/c.md",
                "Source: docs/z.md",
            ]
        );
        assert_eq!(stats.listings, 3);
        assert_eq!(stats.files_found, 4);
    }

    #[tokio::test]
    async fn failed_subtree_does_not_stop_siblings() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/contents/docs",
            serde_json::json!([
                dir_entry(&server, "private", "docs/private"),
                file_entry(&server, "gone.md", "docs/gone.md"),
                file_entry(&server, "ok.md", "docs/ok.md"),
            ]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/contents/docs/private"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/raw/docs/gone.md"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        mount_text(&server, "/raw/docs/ok.md", "fine").await;

        let crawler = GithubCrawler::new(&fast_config(), None).unwrap();
        let mut docs: Vec<Document> = Vec::new();
        let stats = crawler
            .crawl(&format!("{}/contents/docs", server.uri()), &mut docs, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(docs, vec![Document::repo_file("docs/ok.md", "fine")]);
        assert_eq!(stats.listings_failed, 1);
        assert_eq!(stats.files_failed, 1);
    }

    #[tokio::test]
    async fn invalid_listing_json_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/contents/docs"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let crawler = GithubCrawler::new(&fast_config(), None).unwrap();
        let mut docs: Vec<Document> = Vec::new();
        let stats = crawler
            .crawl(&format!("{}/contents/docs", server.uri()), &mut docs, &SilentProgress)
            .await
            .unwrap();

        assert!(docs.is_empty());
        assert_eq!(stats.listings_failed, 1);
    }

    #[tokio::test]
    async fn root_pointing_at_single_file() {
        let server = MockServer::start().await;
        mount_json(&server, "/contents/README.md", file_entry(&server, "README.md", "README.md")).await;
        mount_text(&server, "/raw/README.md", "# Readme").await;

        let crawler = GithubCrawler::new(&fast_config(), Some("tok")).unwrap();
        let mut docs: Vec<Document> = Vec::new();
        crawler
            .crawl(&format!("{}/contents/README.md", server.uri()), &mut docs, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(docs, vec![Document::repo_file("README.md", "# Readme")]);
    }

    #[tokio::test]
    async fn file_without_download_url_is_skipped() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/contents/docs",
            serde_json::json!([{ "name": "a.md", "path": "docs/a.md", "type": "file" }]),
        )
        .await;

        let crawler = GithubCrawler::new(&fast_config(), None).unwrap();
        let mut docs: Vec<Document> = Vec::new();
        let stats = crawler
            .crawl(&format!("{}/contents/docs", server.uri()), &mut docs, &SilentProgress)
            .await
            .unwrap();

        assert!(docs.is_empty());
        assert_eq!(stats.files_failed, 1);
    }
}
