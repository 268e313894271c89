//! Page fetching and HTML-to-Markdown conversion for the sitemap pipeline.
//!
//! Pages are processed strictly one after another. Each converted page is
//! appended to the sink before the next fetch starts.

use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use doccrawl_markdown::{ConvertOptions, ConvertResult, convert};
use doccrawl_shared::{Document, DocumentSink, ProgressReporter, Result, SitemapConfig};

use crate::fetch::Fetcher;
use crate::sitemap::sitemap_fetcher;

// ---------------------------------------------------------------------------
// PageCrawlResult
// ---------------------------------------------------------------------------

/// Summary of one page crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageCrawlResult {
    /// Page URLs handed to the crawler.
    pub pages_total: usize,
    /// Pages converted and appended to the sink.
    pub pages_written: usize,
    /// Pages skipped (fetch failure, non-HTML, conversion failure, no text).
    pub pages_skipped: usize,
    /// Prose words across written pages, fenced code excluded.
    pub words_written: usize,
    /// Per-page failures (URL, reason).
    pub errors: Vec<(String, String)>,
}

// ---------------------------------------------------------------------------
// PageCrawler
// ---------------------------------------------------------------------------

/// Sequential page fetcher with a fixed pause between pages.
#[derive(Debug, Clone)]
pub struct PageCrawler {
    fetcher: Fetcher,
    page_delay: Duration,
}

impl PageCrawler {
    /// Build a page crawler from the `[sitemap]` config section.
    pub fn new(config: &SitemapConfig) -> Result<Self> {
        Ok(Self {
            fetcher: sitemap_fetcher(config)?,
            page_delay: Duration::from_millis(config.page_delay_ms),
        })
    }

    /// Fetch, convert, and append each page in `urls`.
    ///
    /// Per-page failures are recorded and skipped; only a sink error aborts.
    #[instrument(skip_all, fields(pages = urls.len()))]
    pub async fn crawl(
        &self,
        urls: &[String],
        sink: &mut dyn DocumentSink,
        progress: &dyn ProgressReporter,
    ) -> Result<PageCrawlResult> {
        let total = urls.len();
        let mut result = PageCrawlResult {
            pages_total: total,
            ..PageCrawlResult::default()
        };

        for (idx, url) in urls.iter().enumerate() {
            progress.fetching(url, idx + 1, total);
            info!(%url, "processing page {}/{}", idx + 1, total);

            match self.fetch_markdown(url).await {
                Ok(converted) => {
                    sink.append(&Document::page(url.as_str(), converted.markdown))?;
                    result.pages_written += 1;
                    result.words_written += converted.word_count;
                    progress.document_written(url);
                }
                Err(reason) => {
                    warn!(%url, %reason, "skipping page");
                    result.pages_skipped += 1;
                    result.errors.push((url.clone(), reason));
                }
            }

            if idx + 1 < total {
                tokio::time::sleep(self.page_delay).await;
            }
        }

        info!(
            written = result.pages_written,
            total = result.pages_total,
            words = result.words_written,
            "processed {}/{} pages",
            result.pages_written,
            result.pages_total
        );
        Ok(result)
    }

    /// One page converted to Markdown, or the reason it was skipped.
    async fn fetch_markdown(&self, url: &str) -> std::result::Result<ConvertResult, String> {
        let response = self.fetcher.fetch(url).await.map_err(|e| e.to_string())?;

        if !response.is_html() {
            return Err(format!(
                "content type is not HTML ({})",
                response.content_type.as_deref().unwrap_or("none")
            ));
        }

        let converted = convert(
            &response.body,
            &ConvertOptions {
                source_url: url.to_string(),
            },
        )
        .map_err(|e| e.to_string())?;

        if converted.word_count == 0 && !converted.markdown.contains("```") {
            return Err("page has no text content".to_string());
        }
        debug!(
            %url,
            title = converted.title.as_deref().unwrap_or("(untitled)"),
            words = converted.word_count,
            "converted page"
        );
        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doccrawl_shared::{DocCrawlError, SilentProgress};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_crawler() -> PageCrawler {
        PageCrawler::new(&SitemapConfig {
            retry_delay_ms: 0,
            page_delay_ms: 0,
            ..SitemapConfig::default()
        })
        .unwrap()
    }

    async fn mount_html(server: &MockServer, at: &str, html: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html; charset=utf-8"))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn converts_pages_in_order() {
        let server = MockServer::start().await;
        mount_html(&server, "/page1", "<html><body><main><h1>One</h1><p>First page.</p></main></body></html>").await;
        mount_html(&server, "/page2", "<html><body><main><h1>Two</h1><p>Second page.</p></main></body></html>").await;

        let urls = vec![
            format!("{}/page1", server.uri()),
            format!("{}/page2", server.uri()),
        ];
        let mut docs: Vec<Document> = Vec::new();
        let result = fast_crawler()
            .crawl(&urls, &mut docs, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.pages_written, 2);
        assert_eq!(result.words_written, 6);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].source.to_string(), format!("Source URL: {}", urls[0]));
        assert!(docs[0].body.contains("# One"));
        assert!(docs[1].body.contains("Second page."));
    }

    #[tokio::test]
    async fn non_html_and_missing_pages_are_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data.json"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        mount_html(&server, "/ok", "<html><body><p>Still here.</p></body></html>").await;

        let urls = vec![
            format!("{}/data.json", server.uri()),
            format!("{}/gone", server.uri()),
            format!("{}/ok", server.uri()),
        ];
        let mut docs: Vec<Document> = Vec::new();
        let result = fast_crawler()
            .crawl(&urls, &mut docs, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.pages_total, 3);
        assert_eq!(result.pages_written, 1);
        assert_eq!(result.pages_skipped, 2);
        assert_eq!(result.errors.len(), 2);
        assert!(docs[0].body.contains("Still here."));
    }

    #[tokio::test]
    async fn page_without_text_is_skipped() {
        let server = MockServer::start().await;
        mount_html(&server, "/blank", "<html><body><main><nav>Menu</nav><script>x()</script></main></body></html>").await;
        mount_html(&server, "/code", "<html><body><main><pre><code>cargo build</code></pre></main></body></html>").await;

        let urls = vec![
            format!("{}/blank", server.uri()),
            format!("{}/code", server.uri()),
        ];
        let mut docs: Vec<Document> = Vec::new();
        let result = fast_crawler()
            .crawl(&urls, &mut docs, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.pages_skipped, 1);
        assert_eq!(result.errors[0].0, urls[0]);
        assert_eq!(docs.len(), 1);
        assert!(docs[0].body.contains("cargo build"));
    }

    struct FailingSink;

    impl DocumentSink for FailingSink {
        fn append(&mut self, _doc: &Document) -> Result<()> {
            Err(DocCrawlError::io(
                "docs.md",
                std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            ))
        }
    }

    #[tokio::test]
    async fn sink_error_aborts_crawl() {
        let server = MockServer::start().await;
        mount_html(&server, "/page1", "<html><body><p>Text</p></body></html>").await;
        Mock::given(method("GET"))
            .and(path("/page2"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let urls = vec![
            format!("{}/page1", server.uri()),
            format!("{}/page2", server.uri()),
        ];
        let err = fast_crawler()
            .crawl(&urls, &mut FailingSink, &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, DocCrawlError::Io { .. }));
    }
}
