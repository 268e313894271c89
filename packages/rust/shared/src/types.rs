//! Core domain types shared by the discovery, crawler, and output layers.

use serde::{Deserialize, Serialize};

use crate::error::Result;

// ---------------------------------------------------------------------------
// SourceKind
// ---------------------------------------------------------------------------

/// Which pipeline a knowledge file feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Every non-comment line is a GitHub contents API URL.
    Github,
    /// The first non-comment line is a sitemap URL.
    Sitemap,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Github => f.write_str("github"),
            Self::Sitemap => f.write_str("sitemap"),
        }
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Where a document came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Repo-relative path of a Markdown file (e.g. `docs/a.md`).
    RepoPath(String),
    /// URL of an HTML page that was converted to Markdown.
    PageUrl(String),
}

impl std::fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RepoPath(path) => write!(f, "Source: {path}"),
            Self::PageUrl(url) => write!(f, "Source URL: {url}"),
        }
    }
}

/// A unit of Markdown content ready to be appended to an output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub source: DocumentSource,
    pub body: String,
}

impl Document {
    /// A raw Markdown file from a repository tree.
    pub fn repo_file(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            source: DocumentSource::RepoPath(path.into()),
            body: body.into(),
        }
    }

    /// A converted web page.
    pub fn page(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            source: DocumentSource::PageUrl(url.into()),
            body: body.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentSink
// ---------------------------------------------------------------------------

/// Destination for documents as they are produced.
///
/// Traversers hand each document over as soon as it is fetched, so a sink
/// that persists on every call keeps all progress made before a failure.
pub trait DocumentSink {
    /// Persist one document. An error here aborts the current traversal.
    fn append(&mut self, doc: &Document) -> Result<()>;
}

/// In-memory sink, handy for tests and dry runs.
impl DocumentSink for Vec<Document> {
    fn append(&mut self, doc: &Document) -> Result<()> {
        self.push(doc.clone());
        Ok(())
    }
}
