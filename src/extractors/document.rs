// src/extractors/document.rs

//! The document-tree capability the engine is written against: structural
//! selection over a parsed page, plus the small set of traversals the
//! extractors share.

use std::fmt;

use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;

use crate::crawl::models::CourseRequest;
use crate::utils::error::RuleError;

/// Anything that can be searched by CSS selector: a whole page or a
/// subtree of it.
pub trait Searchable<'a> {
    fn select_all(&self, selector: &Selector) -> Vec<ElementRef<'a>>;

    fn select_first(&self, selector: &Selector) -> Option<ElementRef<'a>> {
        self.select_all(selector).into_iter().next()
    }
}

impl<'a> Searchable<'a> for &'a Html {
    fn select_all(&self, selector: &Selector) -> Vec<ElementRef<'a>> {
        let html: &'a Html = self;
        html.select(selector).collect()
    }
}

impl<'a> Searchable<'a> for ElementRef<'a> {
    fn select_all(&self, selector: &Selector) -> Vec<ElementRef<'a>> {
        self.select(selector).collect()
    }
}

/// A compiled CSS selector that remembers its source text for logging.
#[derive(Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct Css {
    source: String,
    selector: Selector,
}

impl Css {
    pub fn parse(source: &str) -> Result<Self, RuleError> {
        let selector = Selector::parse(source).map_err(|e| RuleError::Selector {
            selector: source.to_string(),
            reason: format!("{:?}", e),
        })?;
        Ok(Self { source: source.to_string(), selector })
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl TryFrom<String> for Css {
    type Error = RuleError;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        Css::parse(&source)
    }
}

impl fmt::Debug for Css {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Css({:?})", self.source)
    }
}

/// Ordered fallback chain of selectors. Extractors try each in turn and
/// keep the first one whose result is non-empty after filtering.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct SelectorChain(pub Vec<Css>);

impl SelectorChain {
    #[cfg(test)]
    pub fn parse(sources: &[&str]) -> Result<Self, RuleError> {
        sources
            .iter()
            .map(|s| Css::parse(s))
            .collect::<Result<Vec<_>, _>>()
            .map(SelectorChain)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Css> {
        self.0.iter()
    }

    /// First element matched by the earliest selector that matches anything.
    pub fn first<'a, S: Searchable<'a>>(&self, scope: &S) -> Option<ElementRef<'a>> {
        self.0.iter().find_map(|css| scope.select_first(css.selector()))
    }

    /// Runs `extract` over the matches of each selector in order and returns
    /// the first non-empty result.
    pub fn first_non_empty<'a, S, T, F>(&self, scope: &S, mut extract: F) -> Vec<T>
    where
        S: Searchable<'a>,
        F: FnMut(Vec<ElementRef<'a>>) -> Vec<T>,
    {
        for css in &self.0 {
            let found = extract(scope.select_all(css.selector()));
            if !found.is_empty() {
                return found;
            }
            tracing::trace!("Selector '{}' yielded nothing, trying next", css.source());
        }
        Vec::new()
    }

    /// Selector sources joined for log and error messages.
    pub fn describe(&self) -> String {
        self.0.iter().map(Css::source).collect::<Vec<_>>().join(" | ")
    }
}

/// A fetched course page with the routing metadata captured upstream.
pub struct CoursePage {
    pub html: Html,
    pub request: CourseRequest,
}

impl CoursePage {
    pub fn parse(body: &str, request: CourseRequest) -> Self {
        Self { html: Html::parse_document(body), request }
    }

    pub fn url(&self) -> &str {
        &self.request.url
    }
}

// --- Text helpers ---

/// Element text with runs of whitespace collapsed to single spaces.
pub fn text_of(element: ElementRef) -> String {
    let raw: String = element.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Case-insensitive substring test used for every label comparison.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    normalize(haystack).contains(&normalize(needle))
}

/// Nearest element matching `selector` that comes before `element` in
/// document order. Ancestors count as preceding.
pub fn preceding<'a>(element: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    let root = element.ancestors().last()?;
    let mut nearest = None;
    for node in root.descendants() {
        if node.id() == element.id() {
            break;
        }
        if let Some(candidate) = ElementRef::wrap(node) {
            if selector.matches(&candidate) {
                nearest = Some(candidate);
            }
        }
    }
    nearest
}

/// First element sibling after `element`.
pub fn next_element_sibling(element: ElementRef) -> Option<ElementRef> {
    element.next_siblings().find_map(ElementRef::wrap)
}

/// `dt` elements paired with the `dd` that follows each, in document order.
pub fn definition_pairs<'a, S: Searchable<'a>>(scope: &S) -> Vec<(ElementRef<'a>, ElementRef<'a>)> {
    let Ok(dt) = Selector::parse("dl dt") else {
        return Vec::new();
    };
    scope
        .select_all(&dt)
        .into_iter()
        .filter_map(|term| {
            let value = next_element_sibling(term).filter(|el| el.value().name() == "dd")?;
            Some((term, value))
        })
        .collect()
}

/// `dt`/`dd` pairs as text, keyed by the term.
pub fn definition_list<'a, S: Searchable<'a>>(scope: &S) -> Vec<(String, String)> {
    definition_pairs(scope)
        .into_iter()
        .map(|(term, value)| (text_of(term), text_of(value)))
        .collect()
}
