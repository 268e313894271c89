//! Combined Markdown output file.
//!
//! One `docs.md` per knowledge file. The file is truncated on open, starts
//! with a header naming the documentation set and its roots, and then grows
//! by one delimited block per document. Every block is flushed as soon as it
//! is written.
//!
//! ```text
//! # Combined Documentation for editorjs
//! <!-- Source .knowledge file: editorjs/.knowledge -->
//! <!-- GitHub API Roots: https://api.github.com/... -->
//!
//!
//!
//! ---
//!
//! <!-- Source: docs/a.md -->
//!
//! ---
//!
//! # Hello
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use doccrawl_shared::{DocCrawlError, Document, DocumentSink, Result};

/// File name written inside each group directory.
pub const OUTPUT_FILE_NAME: &str = "docs.md";

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// Output grouping name for a knowledge file: its parent directory's name,
/// or the file stem when there is no named parent.
pub fn group_name(knowledge_file: &Path) -> String {
    knowledge_file
        .parent()
        .and_then(Path::file_name)
        .or_else(|| knowledge_file.file_stem())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "docs".to_string())
}

/// `<output_root>/<group>/docs.md`
pub fn output_path(output_root: &Path, group: &str) -> PathBuf {
    output_root.join(group).join(OUTPUT_FILE_NAME)
}

// ---------------------------------------------------------------------------
// OutputHeader
// ---------------------------------------------------------------------------

/// Header block written at the top of a fresh output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputHeader {
    title: String,
    knowledge_file: String,
    roots: String,
}

impl OutputHeader {
    /// Header for a GitHub-backed documentation set.
    pub fn github(name: &str, knowledge_file: &Path, roots: &[String]) -> Self {
        Self {
            title: format!("Combined Documentation for {name}"),
            knowledge_file: knowledge_file.display().to_string(),
            roots: format!("GitHub API Roots: {}", roots.join(", ")),
        }
    }

    /// Header for a sitemap-backed documentation set.
    pub fn sitemap(name: &str, knowledge_file: &Path, sitemap_url: &str) -> Self {
        Self {
            title: format!("Combined Documentation for {name} (from Sitemap)"),
            knowledge_file: knowledge_file.display().to_string(),
            roots: format!("Source Sitemap URL: {sitemap_url}"),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "# {}\n<!-- Source .knowledge file: {} -->\n<!-- {} -->\n\n",
            self.title, self.knowledge_file, self.roots
        )
    }
}

/// Delimited block for one document.
pub fn render_document(doc: &Document) -> String {
    format!("\n\n---\n\n<!-- {} -->\n\n---\n\n{}", doc.source, doc.body)
}

// ---------------------------------------------------------------------------
// OutputWriter
// ---------------------------------------------------------------------------

/// Append-only writer for one combined output file.
#[derive(Debug)]
pub struct OutputWriter {
    path: PathBuf,
    file: BufWriter<File>,
    documents: usize,
}

impl OutputWriter {
    /// Create (or truncate) the file at `path`, creating parent directories,
    /// and write `header`.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn create(path: &Path, header: &OutputHeader) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DocCrawlError::io(parent, e))?;
            info!(dir = %parent.display(), "output directory ready");
        }

        let file = File::create(path).map_err(|e| DocCrawlError::io(path, e))?;
        let mut writer = Self {
            path: path.to_path_buf(),
            file: BufWriter::new(file),
            documents: 0,
        };
        writer.write_flushed(&header.render())?;
        Ok(writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Documents appended so far.
    pub fn documents_written(&self) -> usize {
        self.documents
    }

    fn write_flushed(&mut self, text: &str) -> Result<()> {
        self.file
            .write_all(text.as_bytes())
            .and_then(|()| self.file.flush())
            .map_err(|e| DocCrawlError::io(&self.path, e))
    }
}

impl DocumentSink for OutputWriter {
    fn append(&mut self, doc: &Document) -> Result<()> {
        self.write_flushed(&render_document(doc))?;
        self.documents += 1;
        debug!(source = %doc.source, total = self.documents, "document flushed");
        Ok(())
    }
}
