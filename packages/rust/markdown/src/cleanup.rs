//! Post-conversion cleanup passes for Markdown produced from HTML.
//!
//! Each pass is a function `&str -> String`; [`run_pipeline`] applies them in
//! order. Fenced code blocks are left untouched by every pass that could
//! alter their content.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Run all cleanup passes on raw Markdown text.
pub(crate) fn run_pipeline(md: &str, base_url: Option<&Url>) -> String {
    let mut result = trim_line_ends(md);
    result = fix_fence_languages(&result);
    result = resolve_relative_links(&result, base_url);
    result = collapse_blank_lines(&result);
    finish_with_newline(&result)
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

/// Strip trailing spaces and tabs outside fenced code blocks.
fn trim_line_ends(md: &str) -> String {
    let mut in_fence = false;
    md.lines()
        .map(|line| {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                return line.trim_end();
            }
            if in_fence { line } else { line.trim_end() }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turn fences like ```` ```language-js ```` into ```` ```js ````.
fn fix_fence_languages(md: &str) -> String {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^(\s*)```(?:language-|lang-|highlight-)([\w+-]+)").expect("valid regex")
    });

    FENCE_RE.replace_all(md, "$1```$2").into_owned()
}

/// Resolve relative link targets against the page URL.
///
/// Images, anchors, `mailto:` and already-absolute links are kept as-is, and
/// so is everything inside fenced code.
fn resolve_relative_links(md: &str, base_url: Option<&Url>) -> String {
    let Some(base) = base_url else {
        return md.to_string();
    };

    let mut in_fence = false;
    md.lines()
        .map(|line| {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                return line.to_string();
            }
            if in_fence {
                line.to_string()
            } else {
                resolve_line_links(line, base)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn resolve_line_links(line: &str, base: &Url) -> String {
    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(!?)\[([^\]]*)\]\(([^)\s]+)\)").expect("valid regex"));

    LINK_RE
        .replace_all(line, |caps: &regex::Captures| {
            let (bang, text, href) = (&caps[1], &caps[2], &caps[3]);
            if !bang.is_empty() || is_absolute_or_local(href) {
                return caps[0].to_string();
            }
            match base.join(href) {
                Ok(resolved) => format!("[{text}]({resolved})"),
                Err(_) => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn is_absolute_or_local(href: &str) -> bool {
    href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("http://")
        || href.starts_with("https://")
}

/// Collapse runs of 3+ blank lines into two.
fn collapse_blank_lines(md: &str) -> String {
    static BLANKS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{4,}").expect("valid regex"));

    BLANKS_RE.replace_all(md, "\n\n\n").into_owned()
}

/// Drop leading blank lines and end with exactly one newline.
fn finish_with_newline(md: &str) -> String {
    let body = md.trim_start_matches('\n').trim_end_matches('\n');
    format!("{body}\n")
}
