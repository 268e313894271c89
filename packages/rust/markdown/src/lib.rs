//! HTML-to-Markdown conversion for crawled documentation pages.
//!
//! Converts raw HTML to Markdown using the `htmd` crate, then applies a series
//! of cleanup passes to normalize whitespace, code fences, and links.

mod cleanup;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use doccrawl_shared::{DocCrawlError, Result};

/// Tags whose content never belongs in the output.
const SKIP_TAGS: [&str; 6] = ["script", "style", "nav", "iframe", "noscript", "svg"];

/// Content containers tried in priority order before falling back to `<body>`.
const CONTENT_SELECTORS: [&str; 4] = ["main", "[role=\"main\"]", "article", "body"];

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Result of converting an HTML page to Markdown.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// The cleaned Markdown body.
    pub markdown: String,
    /// Text of the first H1, if the page has one.
    pub title: Option<String>,
    /// Approximate word count, excluding fenced code.
    pub word_count: usize,
}

/// Options for the HTML-to-Markdown conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Page URL, used to resolve relative links.
    pub source_url: String,
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Convert an HTML page to clean Markdown.
///
/// 1. Pick the main content element (`<main>`, `[role=main]`, `<article>`, `<body>`)
/// 2. Swap `<table>`s for placeholders (htmd flattens them into a line of text)
/// 3. Convert HTML → Markdown via `htmd` and put the rendered tables back
/// 4. Run the cleanup passes
#[instrument(skip(html), fields(url = %opts.source_url))]
pub fn convert(html: &str, opts: &ConvertOptions) -> Result<ConvertResult> {
    let content_html = extract_content_html(html);
    let (content_html, tables) = extract_tables(&content_html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIP_TAGS.to_vec())
        .build();

    let raw_markdown = converter
        .convert(&content_html)
        .map_err(|e| DocCrawlError::Conversion(format!("htmd conversion failed: {e}")))?;

    let raw_markdown = restore_tables(raw_markdown, &tables);

    let base_url = Url::parse(&opts.source_url).ok();
    let markdown = cleanup::run_pipeline(&raw_markdown, base_url.as_ref());

    let title = extract_title(&markdown);
    let word_count = count_words(&markdown);

    debug!(
        raw_len = raw_markdown.len(),
        final_len = markdown.len(),
        word_count,
        "conversion complete"
    );

    Ok(ConvertResult {
        markdown,
        title,
        word_count,
    })
}

// ---------------------------------------------------------------------------
// Content selection
// ---------------------------------------------------------------------------

fn extract_content_html(html: &str) -> String {
    let doc = Html::parse_document(html);

    CONTENT_SELECTORS
        .iter()
        .filter_map(|sel| Selector::parse(sel).ok())
        .find_map(|selector| doc.select(&selector).next().map(|el| el.inner_html()))
        .unwrap_or_else(|| html.to_string())
}

// ---------------------------------------------------------------------------
// Table pre-processing
// ---------------------------------------------------------------------------

/// Marker text substituted for the n-th table during conversion.
fn table_placeholder(idx: usize) -> String {
    format!("DOCCRAWLTABLE{idx}X")
}

/// Replace each `<table>` with a placeholder paragraph.
///
/// Returns the rewritten HTML and the Markdown rendering of each table.
fn extract_tables(html: &str) -> (String, Vec<String>) {
    let Ok(table_sel) = Selector::parse("table") else {
        return (html.to_string(), Vec::new());
    };
    let fragment = Html::parse_fragment(html);

    let mut result = html.to_string();
    let mut tables = Vec::new();
    // Nested tables are rendered as part of their outermost table.
    for table in fragment
        .select(&table_sel)
        .filter(|t| !t.ancestors().filter_map(ElementRef::wrap).any(|a| a.value().name() == "table"))
    {
        let outer = table.html();
        if !result.contains(&outer) {
            continue;
        }
        let placeholder = format!("<p>{}</p>", table_placeholder(tables.len()));
        result = result.replacen(&outer, &placeholder, 1);
        tables.push(table_to_markdown(&table));
    }
    (result, tables)
}

fn restore_tables(mut markdown: String, tables: &[String]) -> String {
    for (idx, table) in tables.iter().enumerate() {
        markdown = markdown.replacen(&table_placeholder(idx), table.trim(), 1);
    }
    markdown
}

fn table_to_markdown(table: &ElementRef) -> String {
    let (Ok(row_sel), Ok(cell_sel)) = (Selector::parse("tr"), Selector::parse("th, td")) else {
        return String::new();
    };

    let mut rows: Vec<Vec<String>> = table
        .select(&row_sel)
        .map(|row| {
            row.select(&cell_sel)
                .map(|cell| {
                    cell.text()
                        .collect::<String>()
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ")
                        .replace('|', "\\|")
                })
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return String::new();
    }
    for row in &mut rows {
        row.resize(width, String::new());
    }

    let mut md = String::new();
    for (idx, row) in rows.iter().enumerate() {
        md.push_str(&format!("| {} |\n", row.join(" | ")));
        if idx == 0 {
            md.push_str(&format!("|{}\n", " --- |".repeat(width)));
        }
    }
    md
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn extract_title(md: &str) -> Option<String> {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^# (.+)$").expect("valid regex"));

    H1_RE.captures(md).map(|c| c[1].trim().to_string())
}

fn count_words(md: &str) -> usize {
    static CODE_BLOCK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));

    CODE_BLOCK_RE
        .replace_all(md, "")
        .split_whitespace()
        .filter(|w| !w.chars().all(|c| c == '#'))
        .count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(url: &str) -> ConvertOptions {
        ConvertOptions {
            source_url: url.to_string(),
        }
    }

    #[test]
    fn convert_simple_html() {
        let html = "<html><body><main><h1>Hello World</h1><p>Some text.</p></main></body></html>";
        let result = convert(html, &opts("https://example.com/page")).unwrap();

        assert!(result.markdown.contains("# Hello World"));
        assert!(result.markdown.contains("Some text."));
        assert_eq!(result.title.as_deref(), Some("Hello World"));
        assert!(result.word_count > 0);
    }

    #[test]
    fn convert_skips_scripts_and_chrome() {
        let html = r#"<html><head><style>body { color: red }</style></head><body>
            <nav><a href="/">Home</a></nav>
            <main><h1>Content</h1><p>Important text.</p><script>alert(1)</script></main>
            <footer><p>Copyright 2024</p></footer>
        </body></html>"#;

        let result = convert(html, &opts("https://example.com/")).unwrap();
        assert!(result.markdown.contains("Important text."));
        assert!(!result.markdown.contains("Copyright 2024"));
        assert!(!result.markdown.contains("alert(1)"));
        assert!(!result.markdown.contains("color: red"));
    }

    #[test]
    fn convert_without_main_uses_body() {
        let html = "<html><body><h1>Direct Body</h1><p>Content in body.</p></body></html>";
        let result = convert(html, &opts("https://example.com/plain")).unwrap();
        assert!(result.markdown.contains("Direct Body"));
        assert!(result.markdown.contains("Content in body."));
    }

    #[test]
    fn convert_preserves_code_blocks() {
        let html = r#"<html><body><main>
            <h1>Code Example</h1>
            <pre><code class="language-rust">fn main() {
    println!("hello");
}</code></pre>
        </main></body></html>"#;

        let result = convert(html, &opts("https://example.com/code")).unwrap();
        assert!(result.markdown.contains("```rust"));
        assert!(result.markdown.contains("println!"));
    }

    #[test]
    fn convert_renders_tables() {
        let html = r#"<html><body><main>
            <h1>Data</h1>
            <table>
                <thead><tr><th>Name</th><th>Value</th></tr></thead>
                <tbody><tr><td>foo</td><td>bar</td></tr></tbody>
            </table>
        </main></body></html>"#;

        let result = convert(html, &opts("https://example.com/data")).unwrap();
        assert!(
            result
                .markdown
                .contains("| Name | Value |\n| --- | --- |\n| foo | bar |")
        );
        assert!(!result.markdown.contains("DOCCRAWLTABLE"));
    }

    #[test]
    fn convert_resolves_relative_links() {
        let html = r#"<html><body><main><p><a href="/guide/setup">Setup</a></p></main></body></html>"#;
        let result = convert(html, &opts("https://docs.example.com/intro")).unwrap();
        assert!(
            result
                .markdown
                .contains("[Setup](https://docs.example.com/guide/setup)")
        );
    }

    #[test]
    fn convert_empty_body() {
        let result = convert("<html><body></body></html>", &opts("https://example.com/empty")).unwrap();
        assert!(result.title.is_none());
        assert_eq!(result.word_count, 0);
    }

    #[test]
    fn word_count_excludes_code_blocks() {
        let md = "# Title\n\nOne two three.\n\n```\nlots of code words that should not count\n```\n";
        assert_eq!(count_words(md), 4);
    }

    #[test]
    fn table_without_header_row_still_renders() {
        let fragment = Html::parse_fragment("<table><tr><td>a</td><td>b|c</td></tr><tr><td>d</td></tr></table>");
        let selector = Selector::parse("table").unwrap();
        let table = fragment.select(&selector).next().unwrap();

        let md = table_to_markdown(&table);
        assert!(md.contains("| a | b\\|c |"));
        assert!(md.contains("| --- | --- |"));
        assert!(md.contains("| d |  |"));
    }
}
