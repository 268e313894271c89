//! Sitemap XML parser.
//!
//! Handles both sitemap flavors defined by <https://www.sitemaps.org/protocol.html>:
//! - `<sitemapindex>` whose `<sitemap><loc>` children point at more sitemaps
//! - `<urlset>` whose `<url><loc>` children point at pages
//!
//! Real-world sitemaps present their elements in one of three ways: in the
//! default sitemap namespace, under an `sm:` prefix, or with no namespace at
//! all. Element lookups try each [`NameStrategy`] in order and use the first
//! one that matches anything.

use doccrawl_shared::{DocCrawlError, Result};
use roxmltree::{Document, Node};

/// The sitemap protocol namespace URI.
pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Conventional prefix used when the namespace is bound to a prefix.
const SITEMAP_PREFIX: &str = "sm";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Parsed representation of one sitemap document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// A sitemap index: locations of nested sitemaps, in document order.
    Index(Vec<String>),
    /// A leaf sitemap: page locations, in document order.
    UrlSet(Vec<String>),
}

/// One way of matching a sitemap element name.
#[derive(Debug, Clone, Copy)]
enum NameStrategy {
    /// `<sitemap xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">`
    DefaultNamespace,
    /// `<sm:sitemap xmlns:sm="...">`
    Prefixed,
    /// `<sitemap>` with no namespace at all.
    Bare,
}

const STRATEGIES: [NameStrategy; 3] = [
    NameStrategy::DefaultNamespace,
    NameStrategy::Prefixed,
    NameStrategy::Bare,
];

impl NameStrategy {
    fn matches(self, node: &Node, local_name: &str) -> bool {
        if !node.is_element() || node.tag_name().name() != local_name {
            return false;
        }
        let namespace = node.tag_name().namespace();
        match self {
            Self::DefaultNamespace => namespace == Some(SITEMAP_NS),
            Self::Prefixed => {
                namespace.and_then(|uri| node.lookup_prefix(uri)) == Some(SITEMAP_PREFIX)
            }
            Self::Bare => namespace.is_none(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a sitemap XML string.
///
/// The document is an index if its root has any `sitemap` children; otherwise
/// it is read as a URL set (possibly empty).
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument> {
    let doc = Document::parse(xml.trim_start())
        .map_err(|e| DocCrawlError::malformed(format!("invalid sitemap XML: {e}")))?;
    let root = doc.root_element();

    let sitemaps = find_children(&root, "sitemap");
    if !sitemaps.is_empty() {
        return Ok(SitemapDocument::Index(collect_locs(&sitemaps)));
    }

    let urls = find_children(&root, "url");
    Ok(SitemapDocument::UrlSet(collect_locs(&urls)))
}

/// Direct children named `local_name`, using the first strategy with any match.
fn find_children<'a, 'input>(parent: &Node<'a, 'input>, local_name: &str) -> Vec<Node<'a, 'input>> {
    for strategy in STRATEGIES {
        let found: Vec<_> = parent
            .children()
            .filter(|child| strategy.matches(child, local_name))
            .collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// First direct child named `local_name`, trying strategies in order.
fn find_child<'a, 'input>(parent: &Node<'a, 'input>, local_name: &str) -> Option<Node<'a, 'input>> {
    STRATEGIES.iter().find_map(|strategy| {
        parent
            .children()
            .find(|child| strategy.matches(child, local_name))
    })
}

/// Trimmed, non-empty `<loc>` text of each entry.
fn collect_locs(entries: &[Node]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|entry| find_child(entry, "loc"))
        .filter_map(|loc| loc.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(String::from)
        .collect()
}
