// src/extractors/fields/dates.rs
use scraper::ElementRef;

use crate::course::{push_unique, Date};
use crate::extractors::document::{contains_ci, definition_pairs, text_of};
use crate::extractors::fields::FieldContext;
use crate::extractors::patterns::find_dates;
use crate::utils::error::ExtractError;

/// Start dates scoped to the qualification. There is no fallback to
/// another qualification's dates: none found means none.
pub fn extract_start_dates(ctx: &FieldContext) -> Result<Vec<Date>, ExtractError> {
    let rules = &ctx.rules().start_dates;
    let dis = ctx.disambiguator();

    let collect = |items: Vec<ElementRef>| {
        let mut found = Vec::new();
        for item in items {
            let text = text_of(item);
            let hits = find_dates(&text);
            if hits.is_empty() || !dis.belongs_to(item, ctx.qualification, ctx.multiple) {
                continue;
            }
            for hit in hits {
                push_unique(&mut found, Date::new(hit));
            }
        }
        found
    };

    let mut dates = rules.items.first_non_empty(&ctx.html(), &collect);
    if dates.is_empty() {
        if let Some(term) = rules.term.as_deref() {
            let values = definition_pairs(&ctx.html())
                .into_iter()
                .filter(|(dt, _)| contains_ci(&text_of(*dt), term))
                .map(|(_, dd)| dd)
                .collect();
            dates = collect(values);
        }
    }

    if dates.is_empty() {
        Err(ExtractError::miss("start_dates", rules.items.describe()))
    } else {
        Ok(dates)
    }
}

/// Dates from the page's own application section, else the site-wide
/// defaults read from the deadlines page earlier in the run.
pub fn extract_application_dates(ctx: &FieldContext) -> Result<Vec<Date>, ExtractError> {
    let rules = &ctx.rules().application_dates;

    let mut dates = rules.sections.first_non_empty(&ctx.html(), |sections| {
        let mut found = Vec::new();
        for section in sections {
            for hit in find_dates(&text_of(section)) {
                push_unique(&mut found, Date::new(hit));
            }
        }
        found
    });
    if let Some(limit) = rules.limit {
        dates.truncate(limit);
    }
    if !dates.is_empty() {
        return Ok(dates);
    }

    if !rules.use_default {
        return Err(ExtractError::miss("application_dates", rules.sections.describe()));
    }
    tracing::debug!("No page-specific application dates at {}; using site defaults", ctx.page.url());
    ctx.cache.default_application_dates().map(<[Date]>::to_vec)
}
