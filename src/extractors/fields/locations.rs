// src/extractors/fields/locations.rs
use crate::course::{push_unique, Location};
use crate::extractors::document::{contains_ci, next_element_sibling, text_of};
use crate::extractors::fields::FieldContext;
use crate::utils::error::ExtractError;

/// Campus names for the qualification, falling back to the location the
/// listing page showed.
pub fn extract_locations(ctx: &FieldContext) -> Result<Vec<Location>, ExtractError> {
    let rules = &ctx.rules().locations;
    let dis = ctx.disambiguator();

    let locations = rules.items.first_non_empty(&ctx.html(), |items| {
        let mut found = Vec::new();
        for item in items {
            let value = if rules.label_keywords.is_empty() {
                Some(item)
            } else if rules.label_keywords.iter().any(|kw| contains_ci(&text_of(item), kw)) {
                next_element_sibling(item)
            } else {
                None
            };
            let Some(value) = value.map(text_of).filter(|v| !v.is_empty()) else {
                continue;
            };
            if dis.belongs_to(item, ctx.qualification, ctx.multiple) {
                push_unique(&mut found, Location::new(value));
            }
        }
        found
    });
    if !locations.is_empty() {
        return Ok(locations);
    }

    ctx.page
        .request
        .location
        .as_deref()
        .map(str::trim)
        .filter(|loc| !loc.is_empty())
        .map(|loc| vec![Location::new(loc)])
        .ok_or_else(|| ExtractError::miss("locations", rules.items.describe()))
}
