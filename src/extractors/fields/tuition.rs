// src/extractors/fields/tuition.rs

//! Fee lines. A page lays fees out as category rows (UK / International,
//! Scotland / England) containing fee-bearing items; each item is attributed
//! to a qualification before it is kept, so a multi-qualification page
//! never leaks one degree's fees into another's record.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};

use crate::course::{push_unique, Tuition};
use crate::extractors::disambiguator::{accepts_label, log_rejection};
use crate::extractors::document::{contains_ci, definition_list, preceding, text_of, Css, Searchable};
use crate::extractors::fields::FieldContext;
use crate::extractors::patterns::{
    canonical_study_mode, match_academic_year, match_duration, match_duration_map, match_fee,
    match_study_mode, recognize_qualifications, DurationEntry,
};
use crate::rules::{Attribution, CategoryRule, TuitionRules};
use crate::utils::error::ExtractError;

static FEE_ITEMS: Lazy<Selector> = Lazy::new(|| Selector::parse("li, p, td").expect("FEE_ITEMS selector"));
static EMPHASIS: Lazy<Selector> = Lazy::new(|| Selector::parse("strong").expect("EMPHASIS selector"));
static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h4").expect("HEADING selector"));

/// Page-level duration summary, parsed once per extraction.
struct DurationSummary {
    entries: BTreeMap<String, Vec<DurationEntry>>,
    text: String,
}

impl DurationSummary {
    fn read(ctx: &FieldContext, rules: &TuitionRules) -> Self {
        let text = rules
            .duration_source
            .first(&ctx.html())
            .map(text_of)
            .or_else(|| {
                let term = rules.duration_term.as_deref()?;
                definition_list(&ctx.html())
                    .into_iter()
                    .find(|(key, _)| contains_ci(key, term))
                    .map(|(_, value)| value)
            })
            .unwrap_or_default();
        Self { entries: match_duration_map(&text), text }
    }

    /// Entry for `qualification` ("" for unlabeled entries), preferring the
    /// one whose study mode is `mode`.
    fn entry(&self, qualification: &str, mode: Option<&str>) -> Option<&DurationEntry> {
        let entries = self.entries.get(&qualification.to_lowercase())?;
        mode.and_then(|mode| {
            entries
                .iter()
                .find(|e| canonical_study_mode(&e.study_mode).is_some_and(|m| contains_ci(mode, m)))
        })
        .or_else(|| entries.first())
    }
}

/// Where a row's student category comes from.
enum RowCategory {
    Named(String),
    /// Fee row without a category of its own ("MSc fees", "Full-time");
    /// each item takes its category from the element before it.
    Shared { names_qualification: bool },
}

fn matches_keywords(text: &str, keywords: &[String]) -> bool {
    keywords.is_empty() || keywords.iter().any(|kw| contains_ci(text, kw))
}

fn category_of(row: ElementRef, category: &CategoryRule, rules: &TuitionRules, qualification: &str) -> Option<RowCategory> {
    if let Some(label) = &category.label {
        return Some(RowCategory::Named(label.clone()));
    }
    let shared_allowed = rules.shared_category.is_some();
    let Some(css) = &rules.category_cell else {
        return shared_allowed.then_some(RowCategory::Shared { names_qualification: false });
    };
    let name = first_line(row.select_first(css.selector())?)?;
    if matches_keywords(name, &rules.category_keywords) {
        return Some(RowCategory::Named(name.to_string()));
    }
    let names_qualification = contains_ci(name, qualification);
    let shared = names_qualification || rules.shared_row_keywords.iter().any(|kw| contains_ci(name, kw));
    (shared && shared_allowed).then_some(RowCategory::Shared { names_qualification })
}

/// Category of one fee item in a shared row: the nearest preceding
/// category element naming a known category, else the fallback label.
fn item_category(item: ElementRef, rules: &TuitionRules) -> Option<String> {
    let selector = rules.item_category.as_ref().map(Css::selector).unwrap_or(&*EMPHASIS);
    preceding(item, selector)
        .map(text_of)
        .filter(|name| !name.is_empty() && matches_keywords(name, &rules.category_keywords))
        .or_else(|| rules.shared_category.clone())
}

fn first_line(cell: ElementRef) -> Option<&str> {
    cell.text().flat_map(str::lines).map(str::trim).find(|line| !line.is_empty())
}

/// Items matching `selector` that contain no other match, so a fee inside
/// `<li><p>..</p></li>` is seen once. A row with no such items is its own
/// single item.
fn leaf_items<'a>(row: ElementRef<'a>, selector: &Selector) -> Vec<ElementRef<'a>> {
    let items: Vec<ElementRef<'a>> = row
        .select_all(selector)
        .into_iter()
        .filter(|item| {
            !item
                .descendants()
                .skip(1)
                .filter_map(ElementRef::wrap)
                .any(|inner| selector.matches(&inner))
        })
        .collect();
    if items.is_empty() {
        vec![row]
    } else {
        items
    }
}

fn fee_of(text: &str, literals: &[String]) -> Option<String> {
    if let Some(fee) = match_fee(text) {
        return Some(fee.to_string());
    }
    literals
        .iter()
        .any(|literal| contains_ci(text, literal))
        .then(|| text.to_string())
}

/// Academic year in `label` usable as the admissions-cycle marker: only
/// when the label names no qualification other than the target.
fn implicit_cycle_marker<'a>(label: &'a str, qualification: &str) -> Option<&'a str> {
    let others = recognize_qualifications(label)
        .into_iter()
        .any(|found| !found.eq_ignore_ascii_case(qualification));
    if others {
        return None;
    }
    match_academic_year(label)
}

fn attributed(ctx: &FieldContext, rules: &TuitionRules, item: ElementRef, text: &str) -> bool {
    if !ctx.multiple {
        return true;
    }
    match &rules.attribution {
        Attribution::Label => ctx.disambiguator().belongs_to(item, ctx.qualification, true),
        Attribution::Emphasis { emphasis, heading } => {
            let emphasis = emphasis.as_ref().map(Css::selector).unwrap_or(&*EMPHASIS);
            let heading = heading.as_ref().map(Css::selector).unwrap_or(&*HEADING);

            let strong = preceding(item, emphasis).map(text_of);
            let label = match strong {
                Some(text) if contains_ci(&text, ctx.qualification) => Some(text),
                other => preceding(item, heading).map(text_of).or(other),
            };
            let cycle = rules.cycle_marker.clone().or_else(|| {
                label
                    .as_deref()
                    .and_then(|label| implicit_cycle_marker(label, ctx.qualification))
                    .map(str::to_string)
            });
            let markers: Vec<&str> = cycle.as_deref().into_iter().collect();

            let accepted = contains_ci(text, ctx.qualification)
                || accepts_label(label.as_deref(), ctx.qualification, true, &markers);
            if !accepted {
                log_rejection(item, ctx.qualification);
            }
            accepted
        }
    }
}

/// Study mode named by each fee column of the table holding `row`.
fn column_modes(ctx: &FieldContext, rules: &TuitionRules, row: ElementRef) -> Vec<String> {
    let Some(css) = &rules.column_headers else {
        return Vec::new();
    };
    let table = row
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "table");
    let cells = match table {
        Some(table) => table.select_all(css.selector()),
        None => (&ctx.html()).select_all(css.selector()),
    };
    cells
        .into_iter()
        .map(|cell| first_line(cell).unwrap_or_default().to_string())
        .collect()
}

fn study_mode_of(
    text: &str,
    column: Option<&str>,
    header: Option<&str>,
    summary: &DurationSummary,
    qualification: &str,
) -> Option<String> {
    match_study_mode(text)
        .or_else(|| column.and_then(match_study_mode))
        .or_else(|| header.and_then(match_study_mode))
        .or_else(|| summary.entry(qualification, None).map(|e| e.study_mode.as_str()))
        .or_else(|| summary.entry("", None).map(|e| e.study_mode.as_str()))
        .map(|phrase| canonical_study_mode(phrase).map(str::to_string).unwrap_or_else(|| phrase.to_string()))
}

fn duration_of(
    text: &str,
    header: Option<&str>,
    summary: &DurationSummary,
    qualification: &str,
    mode: Option<&str>,
) -> Option<String> {
    summary
        .entry(qualification, mode)
        .map(|e| e.duration.as_str())
        .or_else(|| match_duration(text))
        .or_else(|| header.and_then(match_duration))
        .or_else(|| summary.entry("", mode).map(|e| e.duration.as_str()))
        .or_else(|| match_duration(&summary.text))
        .map(str::to_string)
}

pub fn extract_tuitions(ctx: &FieldContext) -> Result<Vec<Tuition>, ExtractError> {
    let rules = &ctx.rules().tuitions;
    if rules.categories.is_empty() {
        return Err(ExtractError::miss("tuitions", "no fee categories configured"));
    }
    let fee_items = rules.fee_items.as_ref().map(Css::selector).unwrap_or(&*FEE_ITEMS);
    let summary = DurationSummary::read(ctx, rules);

    let mut tuitions = Vec::new();
    for category in &rules.categories {
        for row in ctx.html().select(category.rows.selector()) {
            let Some(row_category) = category_of(row, category, rules, ctx.qualification) else {
                continue;
            };
            let header = rules
                .header
                .as_ref()
                .and_then(|css| row.select_first(css.selector()))
                .map(text_of);
            let columns = column_modes(ctx, rules, row);

            for (index, item) in leaf_items(row, fee_items).into_iter().enumerate() {
                let text = text_of(item);
                let Some(fee) = fee_of(&text, &rules.fee_literals) else {
                    continue;
                };
                let student_category = match &row_category {
                    RowCategory::Named(name) => Some(name.clone()),
                    RowCategory::Shared { .. } => item_category(item, rules),
                };
                let row_names_qualification =
                    matches!(row_category, RowCategory::Shared { names_qualification: true });
                if !row_names_qualification && !attributed(ctx, rules, item, &text) {
                    continue;
                }
                let study_mode = study_mode_of(
                    &text,
                    columns.get(index).map(String::as_str),
                    header.as_deref(),
                    &summary,
                    ctx.qualification,
                );
                let duration = duration_of(&text, header.as_deref(), &summary, ctx.qualification, study_mode.as_deref());
                push_unique(&mut tuitions, Tuition { study_mode, duration, student_category, fee: Some(fee) });
            }
        }
    }

    if tuitions.is_empty() {
        let tried = rules.categories.iter().map(|c| c.rows.source()).collect::<Vec<_>>().join(" | ");
        Err(ExtractError::miss("tuitions", tried))
    } else {
        Ok(tuitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::fields::fixtures;
    use crate::extractors::reference::ReferenceCache;

    fn tuition(mode: Option<&str>, duration: Option<&str>, category: &str, fee: &str) -> Tuition {
        Tuition {
            study_mode: mode.map(str::to_string),
            duration: duration.map(str::to_string),
            student_category: Some(category.to_string()),
            fee: Some(fee.to_string()),
        }
    }

    const ACCORDION: &str = r#"
        <html><body>
        <a class="accordion-link">MSc Nursing</a>
        <div class="uk card"><div class="card-header"><a>Full Time 1 Year</a></div>
          <table><tr><td>Tuition</td><td>£9,000</td></tr></table></div>
        <div class="int card"><div class="card-header"><a>Part Time 2 Years</a></div>
          <table><tr><td>£16,000</td></tr></table></div>
        <a class="accordion-link">PGDip Nursing</a>
        <div class="uk card"><div class="card-header"><a>Llawn Amser 1 Blwyddyn</a></div>
          <table><tr><td>NHS funded</td></tr></table></div>
        </body></html>
    "#;

    const ACCORDION_FIELDS: &str = r#"{
        "qualification_labels": "a.accordion-link",
        "tuitions": {
            "categories": [{ "rows": ".uk.card", "label": "UK" }, { "rows": ".int.card", "label": "International" }],
            "header": ".card-header a",
            "fee_items": "td",
            "fee_literals": ["NHS"]
        }
    }"#;

    #[test]
    fn test_label_attribution_with_header_mode_and_literal_fee() {
        let page = fixtures::page(ACCORDION);
        let site = fixtures::rules(ACCORDION_FIELDS);
        let cache = ReferenceCache::new();

        let msc = FieldContext { page: &page, site: &site, cache: &cache, qualification: "MSc", multiple: true };
        assert_eq!(
            extract_tuitions(&msc).unwrap(),
            vec![
                tuition(Some("Full-time"), Some("1 Year"), "UK", "£9,000"),
                tuition(Some("Part-time"), Some("2 Years"), "International", "£16,000"),
            ]
        );

        let pgdip = FieldContext { qualification: "PGDip", ..msc };
        assert_eq!(
            extract_tuitions(&pgdip).unwrap(),
            vec![tuition(Some("Full-time"), Some("1 Blwyddyn"), "UK", "NHS funded")]
        );
    }

    const TWO_DEGREES: &str = r#"
        <html><body><div class="tab-inner">
          <p class="summary">MSc: 12 months full-time; PGDip: 9 months full-time</p>
          <h4>MSc Data Science</h4>
          <table><tr><th>Scotland</th><td>£10,000</td></tr>
                 <tr><th>International</th><td>£25,000</td></tr>
                 <tr><th>Notes</th><td>£0 application fee</td></tr></table>
          <h4>PGDip Data Science</h4>
          <table><tr><th>Scotland</th><td>£7,000</td></tr>
                 <tr><th>International</th><td>£17,000</td></tr></table>
        </div></body></html>
    "#;

    const EMPHASIS_FIELDS: &str = r#"{
        "tuitions": {
            "categories": [{ "rows": "div.tab-inner table tr" }],
            "category_cell": "th",
            "category_keywords": ["scotland", "england", "international", "home"],
            "fee_items": "td",
            "attribution": { "kind": "emphasis" },
            "duration_source": [".summary"]
        }
    }"#;

    #[test]
    fn test_no_cross_contamination_between_qualifications() {
        let page = fixtures::page(TWO_DEGREES);
        let site = fixtures::rules(EMPHASIS_FIELDS);
        let cache = ReferenceCache::new();

        let msc = FieldContext { page: &page, site: &site, cache: &cache, qualification: "MSc", multiple: true };
        assert_eq!(
            extract_tuitions(&msc).unwrap(),
            vec![
                tuition(Some("Full-time"), Some("12 months"), "Scotland", "£10,000"),
                tuition(Some("Full-time"), Some("12 months"), "International", "£25,000"),
            ]
        );

        let pgdip = FieldContext { qualification: "PGDip", ..msc };
        assert_eq!(
            extract_tuitions(&pgdip).unwrap(),
            vec![
                tuition(Some("Full-time"), Some("9 months"), "Scotland", "£7,000"),
                tuition(Some("Full-time"), Some("9 months"), "International", "£17,000"),
            ]
        );
    }

    #[test]
    fn test_admissions_cycle_marker_applies_to_every_qualification() {
        let page = fixtures::page(
            r#"<div class="tab-inner"><p><strong>Fees for 2024/25</strong></p>
               <table><tr><th>Home</th><td>£9,250 per year, full-time</td></tr></table></div>"#,
        );
        let site = fixtures::rules(EMPHASIS_FIELDS);
        let cache = ReferenceCache::new();
        let ctx = FieldContext { page: &page, site: &site, cache: &cache, qualification: "MSc", multiple: true };
        assert_eq!(
            extract_tuitions(&ctx).unwrap(),
            vec![tuition(Some("Full-time"), None, "Home", "£9,250")]
        );
    }

    #[test]
    fn test_column_headers_give_study_modes() {
        let page = fixtures::page(
            r#"<dl><dt>Duration</dt><dd>1 year full-time, 2 years part-time</dd></dl>
               <table class="fees-table">
                 <thead><tr><th>Status</th><th>Full-time</th><th>Part-time</th></tr></thead>
                 <tbody><tr><th>Scotland
                          (home fee status)</th><td>£9,000</td><td>£4,500</td></tr></tbody>
               </table>"#,
        );
        let site = fixtures::rules(
            r#"{ "tuitions": {
                    "categories": [{ "rows": "table.fees-table tbody tr" }],
                    "category_cell": "th",
                    "column_headers": "table.fees-table thead th:not(:first-child)",
                    "fee_items": "td",
                    "duration_term": "Duration" } }"#,
        );
        let cache = ReferenceCache::new();
        let ctx = FieldContext { page: &page, site: &site, cache: &cache, qualification: "MSc", multiple: false };
        assert_eq!(
            extract_tuitions(&ctx).unwrap(),
            vec![
                tuition(Some("Full-time"), Some("1 year"), "Scotland", "£9,000"),
                tuition(Some("Part-time"), Some("2 years"), "Scotland", "£4,500"),
            ]
        );
    }

    #[test]
    fn test_duration_follows_each_fee_study_mode() {
        let page = fixtures::page(
            r#"<p class="summary">MSc: 1 year full-time, MSc: 2 years part-time</p>
               <table><tr><th>Full-time</th><td>£9,000</td></tr>
                      <tr><th>Part-time</th><td>£4,500</td></tr></table>"#,
        );
        let site = fixtures::rules(
            r#"{ "tuitions": {
                    "categories": [{ "rows": "tr", "label": "UK" }],
                    "header": "th",
                    "fee_items": "td",
                    "duration_source": [".summary"] } }"#,
        );
        let cache = ReferenceCache::new();
        let ctx = FieldContext { page: &page, site: &site, cache: &cache, qualification: "MSc", multiple: false };
        assert_eq!(
            extract_tuitions(&ctx).unwrap(),
            vec![
                tuition(Some("Full-time"), Some("1 year"), "UK", "£9,000"),
                tuition(Some("Part-time"), Some("2 years"), "UK", "£4,500"),
            ]
        );
    }

    #[test]
    fn test_column_headers_are_read_per_table() {
        let page = fixtures::page(
            r#"<table class="fees"><thead><tr><th>Status</th><th>Full-time</th></tr></thead>
                 <tbody><tr><th>Scotland</th><td>£9,000</td></tr></tbody></table>
               <table class="fees"><thead><tr><th>Status</th><th>Part-time</th></tr></thead>
                 <tbody><tr><th>International</th><td>£4,500</td></tr></tbody></table>"#,
        );
        let site = fixtures::rules(
            r#"{ "tuitions": {
                    "categories": [{ "rows": "table.fees tbody tr" }],
                    "category_cell": "th",
                    "column_headers": "table.fees thead th:not(:first-child)",
                    "fee_items": "td" } }"#,
        );
        let cache = ReferenceCache::new();
        let ctx = FieldContext { page: &page, site: &site, cache: &cache, qualification: "MSc", multiple: false };
        assert_eq!(
            extract_tuitions(&ctx).unwrap(),
            vec![
                tuition(Some("Full-time"), None, "Scotland", "£9,000"),
                tuition(Some("Part-time"), None, "International", "£4,500"),
            ]
        );
    }

    #[test]
    fn test_shared_fee_rows_fall_back_to_all() {
        let page = fixtures::page(
            r#"<div class="tab-inner">
                 <h4>MSc Data Science</h4>
                 <table>
                   <tr><th>Scotland</th><td>£10,000</td></tr>
                   <tr><th>Additional fee</th><td>£500 bench fee</td></tr>
                   <tr><th>MSc fees</th><td><ul><li><strong>International</strong></li><li>£22,000</li></ul></td></tr>
                 </table>
                 <h4>PGDip Data Science</h4>
                 <table><tr><th>PGDip fees</th><td>£7,000</td></tr></table>
               </div>"#,
        );
        let site = fixtures::rules(
            r#"{ "tuitions": {
                    "categories": [{ "rows": "div.tab-inner table tr" }],
                    "category_cell": "th",
                    "category_keywords": ["scotland", "england", "international", "home"],
                    "shared_category": "All",
                    "shared_row_keywords": ["fee"],
                    "fee_items": "li, td",
                    "attribution": { "kind": "emphasis" } } }"#,
        );
        let cache = ReferenceCache::new();
        let ctx = FieldContext { page: &page, site: &site, cache: &cache, qualification: "MSc", multiple: true };
        assert_eq!(
            extract_tuitions(&ctx).unwrap(),
            vec![
                tuition(None, None, "Scotland", "£10,000"),
                tuition(None, None, "All", "£500"),
                tuition(None, None, "International", "£22,000"),
            ]
        );

        // Without a shared category those rows are skipped
        let strict = fixtures::rules(
            r#"{ "tuitions": {
                    "categories": [{ "rows": "div.tab-inner table tr" }],
                    "category_cell": "th",
                    "category_keywords": ["scotland", "england", "international", "home"],
                    "fee_items": "li, td",
                    "attribution": { "kind": "emphasis" } } }"#,
        );
        let ctx = FieldContext { site: &strict, ..ctx };
        assert_eq!(extract_tuitions(&ctx).unwrap(), vec![tuition(None, None, "Scotland", "£10,000")]);
    }

    #[test]
    fn test_fee_paragraphs_take_category_from_heading() {
        let page = fixtures::page(
            r#"<section id="fees-and-funding">
                 <h3>Home fee</h3><p>£12,750</p>
                 <h3>International fee</h3><p>£28,570</p>
               </section>"#,
        );
        let site = fixtures::rules(
            r##"{ "tuitions": {
                    "categories": [{ "rows": "#fees-and-funding h3 + p" }],
                    "category_keywords": ["home", "international"],
                    "shared_category": "All",
                    "item_category": "#fees-and-funding h3" } }"##,
        );
        let cache = ReferenceCache::new();
        let ctx = FieldContext { page: &page, site: &site, cache: &cache, qualification: "MA", multiple: false };
        assert_eq!(
            extract_tuitions(&ctx).unwrap(),
            vec![
                tuition(None, None, "Home fee", "£12,750"),
                tuition(None, None, "International fee", "£28,570"),
            ]
        );
    }

    #[test]
    fn test_academic_year_in_other_degree_label_is_not_a_wildcard() {
        let page = fixtures::page(
            r#"<div class="tab-inner">
                 <p><strong>PGDip 2024/25</strong></p>
                 <table><tr><th>Home</th><td>£7,000</td></tr></table>
                 <p><strong>MSc 2024/25</strong></p>
                 <table><tr><th>Home</th><td>£10,000</td></tr></table>
               </div>"#,
        );
        let site = fixtures::rules(EMPHASIS_FIELDS);
        let cache = ReferenceCache::new();
        let ctx = FieldContext { page: &page, site: &site, cache: &cache, qualification: "MSc", multiple: true };
        assert_eq!(extract_tuitions(&ctx).unwrap(), vec![tuition(None, None, "Home", "£10,000")]);
    }

    #[test]
    fn test_leaf_items_and_missing_categories() {
        let page = fixtures::page("<ul class='fees'><li><p>UK: £9,000</p></li></ul>");
        let site = fixtures::rules(
            r#"{ "tuitions": { "categories": [{ "rows": "ul.fees", "label": "UK" }] } }"#,
        );
        let cache = ReferenceCache::new();
        let ctx = FieldContext { page: &page, site: &site, cache: &cache, qualification: "MA", multiple: false };
        assert_eq!(extract_tuitions(&ctx).unwrap(), vec![tuition(None, None, "UK", "£9,000")]);

        let bare = fixtures::rules("{}");
        let ctx = FieldContext { site: &bare, ..ctx };
        assert!(extract_tuitions(&ctx).is_err());
    }
}
