// src/crawl/runner.rs
use std::time::Duration;

use scraper::Html;

use crate::crawl::client::download_page;
use crate::crawl::listing::harvest_page;
use crate::crawl::models::CourseRequest;
use crate::extractors::reference::{
    extract_default_application_dates, extract_ielts_equivalents, ReferenceCache,
};
use crate::rules::SiteRules;

/// Fetches the two reference pages and fills the caches. Runs to
/// completion before any course page is requested; a page that cannot be
/// fetched leaves its cache empty and dependent fields degrade.
pub async fn populate_reference_cache(
    client: &reqwest::Client,
    site: &SiteRules,
    cache: &ReferenceCache,
    delay: Duration,
) {
    if let Some(rules) = &site.reference.ielts_table {
        match download_page(client, &rules.url, delay).await {
            Ok(body) => {
                let doc = Html::parse_document(&body);
                cache.populate_ielts_equivalents(extract_ielts_equivalents(&doc, rules));
            }
            Err(e) => tracing::warn!("IELTS equivalents page unavailable: {}", e),
        }
    }

    if let Some(rules) = &site.reference.deadlines {
        match download_page(client, &rules.url, delay).await {
            Ok(body) => {
                let doc = Html::parse_document(&body);
                cache.populate_default_application_dates(extract_default_application_dates(&doc, rules));
            }
            Err(e) => tracing::warn!("Application deadlines page unavailable: {}", e),
        }
    }
}

/// Walks the listing pages, following the next-page link up to the
/// configured page cap.
pub async fn harvest_course_requests(
    client: &reqwest::Client,
    site: &SiteRules,
    delay: Duration,
) -> Vec<CourseRequest> {
    let mut harvested = Vec::new();
    let Some(listing) = &site.listing else {
        return harvested;
    };

    let mut next = Some(listing.url.clone());
    let mut pages = 0;
    while let Some(url) = next.take() {
        if pages >= listing.max_pages {
            tracing::warn!("Stopping after {} listing pages", pages);
            break;
        }
        pages += 1;

        match download_page(client, &url, delay).await {
            Ok(body) => {
                let (found, following) = harvest_page(&body, listing, &url);
                tracing::info!("Listing page {}: {} course(s)", pages, found.len());
                harvested.extend(found);
                next = following.filter(|candidate| candidate != &url);
            }
            Err(e) => tracing::error!("Failed to fetch listing page {}: {}", url, e),
        }
    }
    harvested
}

/// Merges harvested and configured requests, dropping excluded URLs and
/// repeats, and applies the optional limit.
pub fn select_requests(harvested: Vec<CourseRequest>, site: &SiteRules, limit: Option<usize>) -> Vec<CourseRequest> {
    let mut selected: Vec<CourseRequest> = Vec::new();
    for request in harvested.into_iter().chain(site.courses.iter().cloned()) {
        if request.is_excluded(&site.exclude_urls) {
            tracing::debug!("Skipping excluded course page {}", request.url);
            continue;
        }
        if selected.iter().any(|r| r.url == request.url) {
            continue;
        }
        selected.push(request);
    }
    if let Some(limit) = limit {
        selected.truncate(limit);
    }
    selected
}
