use crate::error::{Result, ScrapeError};
use crate::results::NavigationItem;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;
use url::Url;

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid body selector"));
static LIST_ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li").expect("valid li selector"));
static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid anchor selector"));

/// Elements whose text is never rendered
const INVISIBLE: [&str; 4] = ["script", "style", "noscript", "template"];

/// Handle onto the element judged to hold the main content of a page
#[derive(Debug, Clone, Copy)]
pub struct ContentNode<'a> {
    element: ElementRef<'a>,
}

impl<'a> ContentNode<'a> {
    pub fn new(element: ElementRef<'a>) -> Self {
        Self { element }
    }

    pub fn element(&self) -> ElementRef<'a> {
        self.element
    }

    /// Outer HTML of the node
    pub fn html(&self) -> String {
        self.element.html()
    }

    pub fn text_len(&self) -> usize {
        visible_text_len(self.element)
    }
}

/// Number of visible, non-whitespace characters below an element
///
/// Each text node is trimmed before counting; text inside
/// `script`/`style`/`noscript`/`template` is ignored.
pub fn visible_text_len(element: ElementRef<'_>) -> usize {
    let mut len = 0;
    for node in element.descendants() {
        if let Node::Text(text) = node.value() {
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| INVISIBLE.contains(&e.name()))
            });
            if !hidden {
                len += text.trim().chars().count();
            }
        }
    }
    len
}

/// Locates the main content region of a document
#[derive(Debug)]
pub struct ContentSelector {
    candidates: Vec<(String, Selector)>,
}

impl ContentSelector {
    /// Compile the ordered selector list, most specific first
    pub fn new<S: AsRef<str>>(selectors: &[S]) -> Result<Self> {
        let mut candidates = Vec::with_capacity(selectors.len());
        for raw in selectors {
            let raw = raw.as_ref();
            let selector = Selector::parse(raw)
                .map_err(|e| ScrapeError::Config(format!("invalid selector '{raw}': {e}")))?;
            candidates.push((raw.to_string(), selector));
        }
        Ok(Self { candidates })
    }

    /// Select the main content node of a parsed document
    ///
    /// The first selector whose match has visible text wins. Without one, the
    /// direct child of `<body>` with the most text is used (first on ties),
    /// or the body itself when it has no element children.
    pub fn select<'a>(&self, doc: &'a Html) -> Option<ContentNode<'a>> {
        for (raw, selector) in &self.candidates {
            if let Some(element) = doc.select(selector).next() {
                let len = visible_text_len(element);
                ::log::debug!("Selector '{}' matched with {} characters", raw, len);
                if len > 0 {
                    ::log::info!("Main content found with selector '{}'", raw);
                    return Some(ContentNode::new(element));
                }
            }
        }

        ::log::info!("No selector matched, searching body for the largest text block");
        let body = doc.select(&BODY).next()?;
        let mut best: Option<(ElementRef<'a>, usize)> = None;
        for child in body.children().filter_map(ElementRef::wrap) {
            let len = visible_text_len(child);
            if best.is_none_or(|(_, best_len)| len > best_len) {
                best = Some((child, len));
            }
        }

        let (candidate, len) = best.unwrap_or_else(|| (body, visible_text_len(body)));
        if len == 0 {
            return None;
        }
        ::log::info!(
            "Using <{}> with {} characters as main content",
            candidate.value().name(),
            len
        );
        Some(ContentNode::new(candidate))
    }
}

/// Extract the navigation items of a page
///
/// Scans the first element matching `nav_selector`; every `li` holding an
/// anchor with an `href` contributes one item, in document order. A page
/// without the container yields no items.
pub fn extract_navigation_items(
    html: &str,
    current_url: &Url,
    nav_selector: &Selector,
) -> Vec<NavigationItem> {
    if html.is_empty() {
        return Vec::new();
    }

    let doc = Html::parse_document(html);
    let Some(nav) = doc.select(nav_selector).next() else {
        ::log::warn!("Navigation element not found in {}", current_url);
        return Vec::new();
    };

    let mut items = Vec::new();
    for li in nav.select(&LIST_ITEM) {
        let Some(anchor) = li.select(&ANCHOR).next() else {
            continue;
        };
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        match current_url.join(href) {
            Ok(url) => {
                let title = anchor.text().map(str::trim).collect::<String>();
                items.push(NavigationItem { title, url });
            }
            Err(e) => {
                ::log::debug!("Skipping navigation href '{}': {}", href, e);
            }
        }
    }

    ::log::info!("Extracted {} navigation items", items.len());
    items
}
