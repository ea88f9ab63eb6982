// src/extractors/fields/language.rs
use crate::course::LanguageRequirement;
use crate::extractors::document::text_of;
use crate::extractors::fields::FieldContext;
use crate::extractors::patterns::{match_test_score, normalize_ielts_key, score_of};
use crate::utils::error::ExtractError;

/// Test scores stated on the page, one entry per configured test. With
/// equivalents enabled, an IELTS band pulls in the cached table of
/// equivalent scores; a score the page states itself always wins over the
/// table entry for the same test.
pub fn extract_language_requirements(ctx: &FieldContext) -> Result<Vec<LanguageRequirement>, ExtractError> {
    let rules = &ctx.rules().language;

    let texts = rules
        .sections
        .first_non_empty(&ctx.html(), |sections| {
            sections.into_iter().map(text_of).filter(|t| !t.is_empty()).collect()
        });
    if texts.is_empty() {
        return Err(ExtractError::miss("language_requirements", rules.sections.describe()));
    }

    let mut stated: Vec<LanguageRequirement> = Vec::new();
    let mut equivalents: Vec<LanguageRequirement> = Vec::new();

    for test in &rules.tests {
        let Some(score) = texts
            .iter()
            .find_map(|text| match_test_score(text, test).and_then(score_of))
        else {
            continue;
        };

        if rules.use_equivalents && test.eq_ignore_ascii_case("IELTS") {
            let key = normalize_ielts_key(score);
            match ctx.cache.ielts_equivalents() {
                Ok(table) => match table.get(&key) {
                    Some(entries) => equivalents.extend(entries.iter().cloned()),
                    None => tracing::debug!("No IELTS equivalents for band {}", key),
                },
                Err(err) => tracing::warn!("language_requirements: {}", err),
            }
        }

        stated.push(LanguageRequirement {
            language: rules.language.clone(),
            test: Some(test.clone()),
            score: Some(score.to_string()),
        });
    }

    let overridden = |entry: &LanguageRequirement| {
        stated.iter().any(|s| match (&s.test, &entry.test) {
            (Some(a), Some(b)) => b.to_lowercase().starts_with(&a.to_lowercase()),
            _ => false,
        })
    };
    let table_entries: Vec<LanguageRequirement> =
        equivalents.into_iter().filter(|entry| !overridden(entry)).collect();

    let mut requirements = stated;
    requirements.extend(table_entries);

    if requirements.is_empty() {
        Err(ExtractError::miss("language_requirements", rules.tests.join(", ")))
    } else {
        Ok(requirements)
    }
}
