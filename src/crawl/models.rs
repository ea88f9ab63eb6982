// src/crawl/models.rs
use serde::{Deserialize, Serialize};
use url::Url;

/// A course page to fetch, with whatever the listing page told us about it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRequest {
    pub url: String,
    /// Course title as shown on the listing page
    #[serde(default)]
    pub title: Option<String>,
    /// Free text carrying the qualification tokens, e.g. "Data Science MSc/PGDip"
    #[serde(default)]
    pub qualification: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub study_level: Option<String>,
}

impl CourseRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Self::default() }
    }

    #[cfg(test)]
    pub fn with_qualification(mut self, qualification: impl Into<String>) -> Self {
        self.qualification = Some(qualification.into());
        self
    }

    /// True if the URL contains any of the excluded fragments.
    pub fn is_excluded(&self, exclusions: &[String]) -> bool {
        exclusions.iter().any(|fragment| self.url.contains(fragment.as_str()))
    }
}

/// Resolves a listing link against the page it was found on.
pub fn resolve_link(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    match Url::parse(href) {
        Ok(absolute) => Some(absolute.to_string()),
        Err(_) => Url::parse(base).ok()?.join(href).ok().map(|u| u.to_string()),
    }
}
