// src/extractors/fields/modules.rs
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};

use crate::course::{push_unique, Module};
use crate::crawl::models::resolve_link;
use crate::extractors::disambiguator::{accepts_label, log_rejection};
use crate::extractors::document::{preceding, text_of, Css, Searchable};
use crate::extractors::fields::FieldContext;
use crate::utils::error::ExtractError;

static TYPE_HEADING: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h3, h4, h5, h6").expect("TYPE_HEADING selector"));
static DEGREE_HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h3").expect("DEGREE_HEADING selector"));
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("LINK selector"));

// Checked in order; the first keyword the heading contains decides.
const TYPE_KEYWORDS: &[(&str, &str)] = &[
    ("option", "Optional"),
    ("compulsory", "Compulsory"),
    ("core", "Core"),
    ("project", "Project"),
    ("mandatory", "Mandatory"),
];

/// Module type from the text of its governing heading.
pub fn classify_module_type(heading: Option<&str>, default: &str) -> String {
    heading
        .and_then(|text| {
            let lower = text.to_lowercase();
            TYPE_KEYWORDS
                .iter()
                .find(|(keyword, _)| lower.contains(keyword))
                .map(|(_, kind)| kind.to_string())
        })
        .unwrap_or_else(|| default.to_string())
}

fn module_title(item: ElementRef, separator: Option<&str>) -> Option<String> {
    let text = text_of(item);
    let title = match separator {
        Some(sep) => text.split(sep).next().unwrap_or_default().trim(),
        None => text.trim(),
    };
    (!title.is_empty()).then(|| title.to_string())
}

fn module_link(item: ElementRef, base: &str) -> Option<String> {
    let href = item
        .value()
        .attr("href")
        .or_else(|| item.select_first(&LINK).and_then(|a| a.value().attr("href")))?;
    resolve_link(base, href)
}

/// Module list for the qualification. On multi-qualification pages each
/// item must sit under a degree heading naming the qualification, or under
/// a generic "modules" heading shared by all of them.
pub fn extract_modules(ctx: &FieldContext) -> Result<Vec<Module>, ExtractError> {
    let rules = &ctx.rules().modules;
    let type_heading = rules.type_heading.as_ref().map(Css::selector).unwrap_or(&*TYPE_HEADING);
    let degree_heading = rules.degree_heading.as_ref().map(Css::selector).unwrap_or(&*DEGREE_HEADING);
    let markers = [rules.generic_marker.as_str()];

    let modules = rules.items.first_non_empty(&ctx.html(), |matched| {
        let items: Vec<ElementRef> = match &rules.list_items {
            Some(children) => matched
                .into_iter()
                .flat_map(|item| item.select_all(children.selector()))
                .collect(),
            None => matched,
        };

        let mut found = Vec::new();
        for item in items {
            let Some(title) = module_title(item, rules.title_separator.as_deref()) else {
                continue;
            };
            if ctx.multiple {
                let degree = preceding(item, degree_heading).map(text_of);
                if !accepts_label(degree.as_deref(), ctx.qualification, true, &markers) {
                    log_rejection(item, ctx.qualification);
                    continue;
                }
            }
            let heading = preceding(item, type_heading).map(text_of);
            push_unique(
                &mut found,
                Module {
                    module_type: Some(classify_module_type(heading.as_deref(), &rules.default_type)),
                    title: Some(title),
                    link: module_link(item, ctx.page.url()),
                },
            );
        }
        found
    });

    if modules.is_empty() {
        Err(ExtractError::miss("modules", rules.items.describe()))
    } else {
        Ok(modules)
    }
}
