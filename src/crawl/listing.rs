// src/crawl/listing.rs
use scraper::{ElementRef, Html};
use serde_json::Value;
use url::Url;

use crate::crawl::models::{resolve_link, CourseRequest};
use crate::extractors::document::{text_of, Css, Searchable};
use crate::rules::{JsonListing, ListingRules};

fn sub_text(item: ElementRef, css: Option<&Css>) -> Option<String> {
    let element = item.select_first(css?.selector())?;
    Some(text_of(element)).filter(|text| !text.is_empty())
}

/// Pulls the real course URL out of a search-redirect link.
fn unwrap_redirect(link: &str, param: &str) -> Option<String> {
    let parsed = Url::parse(link).ok()?;
    let target = parsed
        .query_pairs()
        .find(|(key, _)| key == param)
        .map(|(_, value)| value.into_owned());
    target
}

fn course_link(item: ElementRef, rules: &ListingRules, base: &str) -> Option<String> {
    let anchor = match &rules.link {
        Some(css) => item.select_first(css.selector())?,
        None => item,
    };
    let resolved = resolve_link(base, anchor.value().attr("href")?)?;
    match &rules.link_param {
        Some(param) => unwrap_redirect(&resolved, param),
        None => Some(resolved),
    }
}

/// Course requests found in one fetched listing body, plus the next
/// page's URL.
pub fn harvest_page(body: &str, rules: &ListingRules, base: &str) -> (Vec<CourseRequest>, Option<String>) {
    match &rules.json {
        Some(json) => match serde_json::from_str::<Value>(body) {
            Ok(value) => (harvest_json_listing(&value, json, base), None),
            Err(e) => {
                tracing::error!("Listing at {} is not valid JSON: {}", base, e);
                (Vec::new(), None)
            }
        },
        None => harvest_listing(&Html::parse_document(body), rules, base),
    }
}

/// Course requests from a JSON search response.
pub fn harvest_json_listing(value: &Value, rules: &JsonListing, base: &str) -> Vec<CourseRequest> {
    let Some(results) = value.pointer(&rules.results).and_then(Value::as_array) else {
        tracing::warn!("No result array at '{}' in listing {}", rules.results, base);
        return Vec::new();
    };

    let mut requests: Vec<CourseRequest> = Vec::new();
    for result in results {
        let Some(url) = result
            .get(&rules.url_key)
            .and_then(Value::as_str)
            .and_then(|href| resolve_link(base, href))
        else {
            tracing::debug!("Listing result without '{}': {}", rules.url_key, result);
            continue;
        };
        if requests.iter().any(|r| r.url == url) {
            continue;
        }
        let title = result
            .get(&rules.title_key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .map(str::to_string);
        requests.push(CourseRequest { url, title, ..CourseRequest::default() });
    }

    tracing::debug!("Harvested {} course link(s) from {}", requests.len(), base);
    requests
}

/// Course requests found on one HTML listing page, plus the next page's URL.
pub fn harvest_listing(doc: &Html, rules: &ListingRules, base: &str) -> (Vec<CourseRequest>, Option<String>) {
    let mut requests: Vec<CourseRequest> = Vec::new();
    let items = rules.items.as_ref().map(|css| doc.select(css.selector()).collect::<Vec<_>>()).unwrap_or_default();

    for item in items {
        let Some(url) = course_link(item, rules, base) else {
            tracing::debug!("Listing item without a usable link: {}", text_of(item));
            continue;
        };
        if requests.iter().any(|r| r.url == url) {
            continue;
        }
        let title = match &rules.title {
            Some(css) => sub_text(item, Some(css)),
            None => Some(text_of(item)).filter(|text| !text.is_empty()),
        };
        requests.push(CourseRequest {
            url,
            title,
            qualification: sub_text(item, rules.qualification.as_ref()),
            location: sub_text(item, rules.location.as_ref()),
            study_level: sub_text(item, rules.level.as_ref()),
        });
    }

    let next = rules
        .next_page
        .as_ref()
        .and_then(|css| (&doc).select_first(css.selector()))
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| resolve_link(base, href));

    tracing::debug!("Harvested {} course link(s) from {}", requests.len(), base);
    (requests, next)
}
