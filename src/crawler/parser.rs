//! HTML parser for extracting links, title, and indexable text
//!
//! Parsing never fails: html5ever recovers from malformed markup, and
//! anything that cannot be interpreted degrades to "no links" or "no text".

use crate::crawler::frontier::CrawlTask;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Elements whose text content is not page prose
const NON_TEXT_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Resolved targets of every followable anchor, in document order
    pub links: Vec<String>,

    /// Visible text, one space between text nodes
    pub text: String,
}

impl ParsedPage {
    /// Builds one child task of `task` per extracted link, in document order
    pub fn child_tasks(&self, task: &CrawlTask) -> Vec<CrawlTask> {
        self.links
            .iter()
            .map(|address| task.child(address.as_str()))
            .collect()
    }
}

/// Parses HTML content and extracts title, links and text
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only references
///
/// Absolute references are kept exactly as written. Relative references
/// are resolved against `base_url`; when there is no usable base they are
/// dropped.
///
/// # Example
///
/// ```
/// use spider_index::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, Some(&base_url));
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: Option<&Url>) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        links: extract_hrefs(&document, base_url),
        text: extract_text(&document),
    }
}

/// Turns fetched page content into child crawl tasks of `task`
///
/// Relative references resolve against the task's own address.
pub fn extract_links(content: &str, task: &CrawlTask) -> Vec<CrawlTask> {
    let base_url = Url::parse(&task.address).ok();
    parse_html(content, base_url.as_ref()).child_tasks(task)
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_hrefs(document: &Html, base_url: Option<&Url>) -> Vec<String> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Resolves a link href to a crawlable address
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only references
/// - relative references with no base, or that fail to resolve
fn resolve_link(href: &str, base_url: Option<&Url>) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    match Url::parse(href) {
        Ok(absolute) => {
            if matches!(absolute.scheme(), "http" | "https") {
                Some(href.to_string())
            } else {
                None
            }
        }
        Err(url::ParseError::RelativeUrlWithoutBase) => base_url
            .and_then(|base| base.join(href).ok())
            .filter(|resolved| matches!(resolved.scheme(), "http" | "https"))
            .map(String::from),
        Err(_) => None,
    }
}

fn extract_text(document: &Html) -> String {
    let mut text = String::new();

    for node in document.root_element().descendants() {
        let Node::Text(fragment) = node.value() else {
            continue;
        };

        let hidden = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|element| NON_TEXT_ELEMENTS.contains(&element.value().name()));
        if hidden {
            continue;
        }

        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(fragment);
    }

    text
}
