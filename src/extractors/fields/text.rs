// src/extractors/fields/text.rs

//! Single-value fields: titles, descriptions and the markup snippets kept
//! verbatim (about, entry requirements).

use crate::extractors::document::{text_of, SelectorChain};
use crate::extractors::fields::FieldContext;
use crate::utils::error::ExtractError;

fn first_text(ctx: &FieldContext, chain: &SelectorChain, field: &'static str) -> Result<String, ExtractError> {
    chain
        .iter()
        .filter_map(|css| ctx.html().select(css.selector()).next())
        .map(text_of)
        .find(|text| !text.is_empty())
        .ok_or_else(|| ExtractError::miss(field, chain.describe()))
}

fn first_markup(ctx: &FieldContext, chain: &SelectorChain, field: &'static str) -> Result<String, ExtractError> {
    chain
        .iter()
        .filter_map(|css| ctx.html().select(css.selector()).next())
        .find(|el| !text_of(*el).is_empty())
        .map(|el| el.html().trim().to_string())
        .ok_or_else(|| ExtractError::miss(field, chain.describe()))
}

/// Listing title first, then the page's own heading.
pub fn extract_title(ctx: &FieldContext) -> Result<String, ExtractError> {
    if let Some(title) = ctx.page.request.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(title.to_string());
    }
    first_text(ctx, &ctx.rules().title, "title")
}

/// Page branding if configured, else the name fixed in the rule set.
pub fn extract_university_title(ctx: &FieldContext) -> Result<String, ExtractError> {
    first_text(ctx, &ctx.rules().university_title, "university_title").or_else(|miss| {
        let fixed = ctx.site.university_title.trim();
        if fixed.is_empty() {
            Err(miss)
        } else {
            Ok(fixed.to_string())
        }
    })
}

pub fn extract_study_level(ctx: &FieldContext) -> Option<String> {
    ctx.page
        .request
        .study_level
        .clone()
        .or_else(|| ctx.site.study_level.clone())
        .filter(|level| !level.trim().is_empty())
}

pub fn extract_description(ctx: &FieldContext) -> Result<Option<String>, ExtractError> {
    first_text(ctx, &ctx.rules().description, "description").map(Some)
}

pub fn extract_about(ctx: &FieldContext) -> Result<Option<String>, ExtractError> {
    first_markup(ctx, &ctx.rules().about, "about").map(Some)
}

pub fn extract_entry_requirements(ctx: &FieldContext) -> Result<Option<String>, ExtractError> {
    first_markup(ctx, &ctx.rules().entry_requirements, "entry_requirements").map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::fields::fixtures;
    use crate::extractors::reference::ReferenceCache;

    const PAGE: &str = r#"
        <html><body>
        <h1 class="heading1">MA Fashion Design</h1>
        <div id="overview"><p>  A studio-led
            course. </p></div>
        <section id="entry-requirements"><p>An honours degree.</p></section>
        <div id="empty"></div>
        </body></html>
    "#;

    const FIELDS: &str = r##"{
        "title": ["h2.missing", "h1.heading1"],
        "description": ["#empty", "#overview p"],
        "about": ["#overview"],
        "entry_requirements": ["#entry-requirements"]
    }"##;

    #[test]
    fn test_text_fields_follow_fallback_chains() {
        let page = fixtures::page(PAGE);
        let site = fixtures::rules(FIELDS);
        let cache = ReferenceCache::new();
        let ctx = FieldContext { page: &page, site: &site, cache: &cache, qualification: "MA", multiple: false };

        assert_eq!(extract_title(&ctx).unwrap(), "MA Fashion Design");
        assert_eq!(extract_description(&ctx).unwrap().as_deref(), Some("A studio-led course."));
        assert!(extract_about(&ctx).unwrap().unwrap().starts_with("<div id=\"overview\">"));
        assert!(extract_entry_requirements(&ctx).unwrap().unwrap().contains("An honours degree."));
        assert_eq!(extract_university_title(&ctx).unwrap(), "Test University");
        assert_eq!(extract_study_level(&ctx), None);
    }

    #[test]
    fn test_listing_title_wins_and_misses_are_errors() {
        let mut page = fixtures::page("<html><body><p>nothing</p></body></html>");
        page.request.title = Some(" Data Science ".to_string());
        let site = fixtures::rules(FIELDS);
        let cache = ReferenceCache::new();
        let ctx = FieldContext { page: &page, site: &site, cache: &cache, qualification: "MSc", multiple: false };

        assert_eq!(extract_title(&ctx).unwrap(), "Data Science");
        assert!(matches!(
            extract_description(&ctx),
            Err(ExtractError::StructuralMiss { field: "description", .. })
        ));
        assert!(extract_about(&ctx).is_err());
    }
}
