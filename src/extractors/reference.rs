// src/extractors/reference.rs

//! The two write-once/read-many caches filled from fixed reference pages
//! at the start of a run: the IELTS-equivalent score table and the
//! site-wide default application deadlines.
//!
//! Lifecycle: create one `ReferenceCache` per run, populate it from the
//! reference pages, then hand `&ReferenceCache` to the assembler. Readers
//! that run before population see `CacheUnavailable` and fall back to the
//! field default. Nothing ever overwrites a populated cache.

use std::collections::BTreeMap;

use once_cell::sync::OnceCell;
use scraper::{Html, Selector};

use crate::course::{Date, LanguageRequirement};
use crate::extractors::document::{contains_ci, text_of, Searchable};
use crate::extractors::patterns::match_date;
use crate::rules::{DeadlineRules, IeltsTableRules};
use crate::utils::error::ExtractError;

/// Band key ("6.5") to the equivalent scores on other tests.
pub type IeltsEquivalents = BTreeMap<String, Vec<LanguageRequirement>>;

#[derive(Debug, Default)]
pub struct ReferenceCache {
    ielts_equivalents: OnceCell<IeltsEquivalents>,
    default_application_dates: OnceCell<Vec<Date>>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the equivalence table. Returns false (and keeps the first
    /// table) if it was already populated.
    pub fn populate_ielts_equivalents(&self, table: IeltsEquivalents) -> bool {
        let bands = table.len();
        match self.ielts_equivalents.set(table) {
            Ok(()) => {
                tracing::info!("IELTS equivalents cached for {} bands", bands);
                true
            }
            Err(_) => {
                tracing::warn!("IELTS equivalents already populated; ignoring second table");
                false
            }
        }
    }

    pub fn populate_default_application_dates(&self, dates: Vec<Date>) -> bool {
        let count = dates.len();
        match self.default_application_dates.set(dates) {
            Ok(()) => {
                tracing::info!("Default application dates cached ({} dates)", count);
                true
            }
            Err(_) => {
                tracing::warn!("Default application dates already populated; ignoring");
                false
            }
        }
    }

    pub fn ielts_equivalents(&self) -> Result<&IeltsEquivalents, ExtractError> {
        self.ielts_equivalents
            .get()
            .ok_or(ExtractError::CacheUnavailable("ielts_equivalents"))
    }

    pub fn default_application_dates(&self) -> Result<&[Date], ExtractError> {
        self.default_application_dates
            .get()
            .map(Vec::as_slice)
            .ok_or(ExtractError::CacheUnavailable("default_application_dates"))
    }
}

/// Reads the approved-tests table: first column names the test, each
/// following column holds the score equivalent to one IELTS band.
pub fn extract_ielts_equivalents(doc: &Html, rules: &IeltsTableRules) -> IeltsEquivalents {
    let mut table: IeltsEquivalents =
        rules.bands.iter().map(|band| (band.clone(), Vec::new())).collect();

    let Some(container) = (&doc).select_first(rules.table.selector()) else {
        tracing::warn!("IELTS equivalents table '{}' not found", rules.table.source());
        return table;
    };
    let (Ok(row_sel), Ok(cell_sel)) = (Selector::parse("tr"), Selector::parse("td")) else {
        return table;
    };

    for (column, band) in rules.bands.iter().enumerate() {
        for row in container.select(&row_sel) {
            let cells: Vec<String> = row.select(&cell_sel).map(text_of).collect();
            let (Some(test), Some(score)) = (cells.first(), cells.get(column + 1)) else {
                continue;
            };
            if score.is_empty() || contains_ci(score, &rules.skip_marker) {
                continue;
            }
            if let Some(entries) = table.get_mut(band) {
                entries.push(LanguageRequirement::english(test.as_str(), score.as_str()));
            }
        }
    }
    table
}

/// Every cell on the deadlines page that carries a date contributes its
/// first date phrase, in page order.
pub fn extract_default_application_dates(doc: &Html, rules: &DeadlineRules) -> Vec<Date> {
    let dates = rules.cells.first_non_empty(&doc, |cells| {
        cells
            .into_iter()
            .filter_map(|cell| match_date(&text_of(cell)).map(Date::new))
            .collect()
    });
    if dates.is_empty() {
        tracing::warn!("No deadlines found with '{}'", rules.cells.describe());
    }
    dates
}
