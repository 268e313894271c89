//! End-to-end run: knowledge files → traversal → combined `docs.md` files.
//!
//! Each configured source is processed in order and on its own: a missing
//! knowledge file, an unwritable output path, or a failed crawl is recorded
//! in that source's [`SourceReport`] and the run moves on.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{error, info, instrument, warn};

use doccrawl_crawler::{GithubCrawler, PageCrawler, SitemapResolver, TreeStats};
use doccrawl_discovery::{read_github_roots, read_sitemap_root};
use doccrawl_shared::{AppConfig, ProgressReporter, Result, SourceEntry, SourceKind};

use crate::output::{OutputHeader, OutputWriter, group_name, output_path};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// How processing one knowledge file ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    /// Every root was traversed (individual documents may still have failed).
    Completed,
    /// Nothing to do; no output file was written.
    Skipped(String),
    /// Output could not be created or written; the file may be partial.
    Failed(String),
}

/// Outcome of one knowledge file.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub knowledge_file: PathBuf,
    pub kind: SourceKind,
    /// Output grouping name (parent directory of the knowledge file).
    pub group: String,
    /// Output file, if one was created.
    pub output: Option<PathBuf>,
    pub status: SourceStatus,
    /// Root locators read from the knowledge file.
    pub roots: usize,
    /// Files or pages discovered.
    pub found: usize,
    /// Documents appended to the output.
    pub written: usize,
    /// Listings, files, or pages that were abandoned.
    pub failed: usize,
}

impl SourceReport {
    fn new(entry: &SourceEntry) -> Self {
        Self {
            knowledge_file: entry.knowledge_file.clone(),
            kind: entry.kind,
            group: group_name(&entry.knowledge_file),
            output: None,
            status: SourceStatus::Completed,
            roots: 0,
            found: 0,
            written: 0,
            failed: 0,
        }
    }

    fn into_skipped(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!(knowledge_file = %self.knowledge_file.display(), %reason, "skipping knowledge file");
        self.status = SourceStatus::Skipped(reason);
        self
    }

    fn into_failed(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        error!(knowledge_file = %self.knowledge_file.display(), %reason, "knowledge file failed");
        self.status = SourceStatus::Failed(reason);
        self
    }
}

/// Result of a whole run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub sources: Vec<SourceReport>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn documents_written(&self) -> usize {
        self.sources.iter().map(|s| s.written).sum()
    }

    /// Sources that did not complete.
    pub fn incomplete(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| s.status != SourceStatus::Completed)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Process every source in `config.sources`.
///
/// `token` is the GitHub credential read at startup, if any. Only failing to
/// build an HTTP client aborts the run; everything else is contained per source.
#[instrument(skip_all, fields(sources = config.sources.len()))]
pub async fn run(
    config: &AppConfig,
    token: Option<&str>,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let start = Instant::now();
    let has_github = config.sources.iter().any(|s| s.kind == SourceKind::Github);

    if has_github && token.is_none() {
        warn!(
            token_env = %config.github.token_env,
            "no GitHub token set; unauthenticated requests are limited to 60 per hour. \
             Create a personal access token with public_repo scope and export it as {}",
            config.github.token_env
        );
    }

    let github = GithubCrawler::new(&config.github, token)?;
    let resolver = SitemapResolver::new(&config.sitemap)?;
    let pages = PageCrawler::new(&config.sitemap)?;

    info!(output_root = %config.output_root.display(), "starting run");

    let mut sources = Vec::with_capacity(config.sources.len());
    for entry in &config.sources {
        info!(
            knowledge_file = %entry.knowledge_file.display(),
            kind = %entry.kind,
            "processing knowledge file"
        );
        let report = match entry.kind {
            SourceKind::Github => {
                run_github(entry, &config.output_root, &github, progress).await
            }
            SourceKind::Sitemap => {
                run_sitemap(entry, &config.output_root, &resolver, &pages, progress).await
            }
        };
        sources.push(report);
    }

    progress.finish();

    let summary = RunSummary {
        sources,
        elapsed: start.elapsed(),
    };
    info!(
        documents = summary.documents_written(),
        incomplete = summary.incomplete(),
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "run finished"
    );
    Ok(summary)
}

#[instrument(skip_all, fields(knowledge_file = %entry.knowledge_file.display()))]
async fn run_github(
    entry: &SourceEntry,
    output_root: &Path,
    crawler: &GithubCrawler,
    progress: &dyn ProgressReporter,
) -> SourceReport {
    let mut report = SourceReport::new(entry);
    progress.phase(&format!("{} (github)", report.group));

    let roots = match read_github_roots(&entry.knowledge_file) {
        Ok(roots) => roots,
        Err(e) => return report.into_skipped(format!("cannot read knowledge file: {e}")),
    };
    if roots.is_empty() {
        return report.into_skipped("no valid URLs found");
    }
    report.roots = roots.len();

    let path = output_path(output_root, &report.group);
    let header = OutputHeader::github(&report.group, &entry.knowledge_file, &roots);
    let mut writer = match OutputWriter::create(&path, &header) {
        Ok(writer) => writer,
        Err(e) => return report.into_failed(e.to_string()),
    };
    report.output = Some(path.clone());

    info!(
        group = %report.group,
        roots = roots.len(),
        output = %path.display(),
        "processing documentation"
    );
    for (idx, root) in roots.iter().enumerate() {
        info!("[{}] {}", idx + 1, root);
    }

    let mut totals = TreeStats::default();
    for root in &roots {
        info!(%root, "starting crawl for root");
        match crawler.crawl(root, &mut writer, progress).await {
            Ok(stats) => totals += stats,
            Err(e) => {
                report.found = totals.files_found;
                report.written = writer.documents_written();
                report.failed = totals.listings_failed + totals.files_failed;
                return report.into_failed(e.to_string());
            }
        }
        info!(%root, "finished crawl for root");
    }

    report.found = totals.files_found;
    report.written = writer.documents_written();
    report.failed = totals.listings_failed + totals.files_failed;
    info!(
        group = %report.group,
        written = report.written,
        output = %path.display(),
        "documentation set complete"
    );
    report
}

#[instrument(skip_all, fields(knowledge_file = %entry.knowledge_file.display()))]
async fn run_sitemap(
    entry: &SourceEntry,
    output_root: &Path,
    resolver: &SitemapResolver,
    pages: &PageCrawler,
    progress: &dyn ProgressReporter,
) -> SourceReport {
    let mut report = SourceReport::new(entry);
    progress.phase(&format!("{} (sitemap)", report.group));

    let sitemap_url = match read_sitemap_root(&entry.knowledge_file) {
        Ok(Some(url)) => url,
        Ok(None) => return report.into_skipped("missing sitemap URL"),
        Err(e) => return report.into_skipped(format!("cannot read knowledge file: {e}")),
    };
    report.roots = 1;

    info!(group = %report.group, sitemap = %sitemap_url, "resolving sitemap");
    let urls = resolver.resolve(&sitemap_url).await;
    if urls.is_empty() {
        return report.into_skipped("no page URLs found or sitemap processing failed");
    }
    report.found = urls.len();
    info!(group = %report.group, pages = urls.len(), "found unique page URLs");

    let path = output_path(output_root, &report.group);
    let header = OutputHeader::sitemap(&report.group, &entry.knowledge_file, &sitemap_url);
    let mut writer = match OutputWriter::create(&path, &header) {
        Ok(writer) => writer,
        Err(e) => return report.into_failed(e.to_string()),
    };
    report.output = Some(path.clone());

    match pages.crawl(&urls, &mut writer, progress).await {
        Ok(result) => {
            report.written = result.pages_written;
            report.failed = result.pages_skipped;
            info!(
                group = %report.group,
                output = %path.display(),
                "successfully processed {}/{} pages",
                result.pages_written,
                result.pages_total
            );
            report
        }
        Err(e) => {
            report.written = writer.documents_written();
            report.into_failed(e.to_string())
        }
    }
}
