// src/rules/mod.rs

//! Per-site rule sets. Each university is a JSON document of selectors and
//! matcher options fed to the one shared engine; no site gets its own code.
//! Every selector is compiled while the file loads, so a typo fails the run
//! up front instead of silently blanking a field.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::crawl::models::CourseRequest;
use crate::extractors::document::{Css, SelectorChain};
use crate::utils::error::RuleError;

const DEFAULT_USER_AGENT: &str = "course_extractor/0.1 (postgraduate course indexing)";

#[derive(Debug, Clone, Deserialize)]
pub struct SiteRules {
    /// Short identifier used in output paths, e.g. "swansea"
    pub site_id: String,
    pub university_title: String,
    #[serde(default)]
    pub study_level: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub reference: ReferenceRules,
    #[serde(default)]
    pub listing: Option<ListingRules>,
    /// Course pages fetched in addition to whatever the listing yields
    #[serde(default)]
    pub courses: Vec<CourseRequest>,
    /// URL fragments of pages that must never produce records
    #[serde(default)]
    pub exclude_urls: Vec<String>,
    #[serde(default)]
    pub fields: FieldRules,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl SiteRules {
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RuleError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| RuleError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let rules = Self::from_json(&json)?;
        tracing::info!("Loaded rule set '{}' from {}", rules.site_id, path.display());
        Ok(rules)
    }
}

/// The two fixed pages read once per run to fill the reference caches.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferenceRules {
    #[serde(default)]
    pub ielts_table: Option<IeltsTableRules>,
    #[serde(default)]
    pub deadlines: Option<DeadlineRules>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IeltsTableRules {
    pub url: String,
    pub table: Css,
    /// Band key for each score column, left to right after the test-name column
    #[serde(default = "default_bands")]
    pub bands: Vec<String>,
    /// Cells containing this text restate the band and are skipped
    #[serde(default = "default_skip_marker")]
    pub skip_marker: String,
}

fn default_bands() -> Vec<String> {
    vec!["6.0".to_string(), "6.5".to_string(), "7.0".to_string()]
}

fn default_skip_marker() -> String {
    "Equivalent to IELTS".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeadlineRules {
    pub url: String,
    pub cells: SelectorChain,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingRules {
    pub url: String,
    /// One match per course on an HTML listing page
    #[serde(default)]
    pub items: Option<Css>,
    /// Set when the listing is a JSON search response instead of HTML
    #[serde(default)]
    pub json: Option<JsonListing>,
    /// Element carrying the href; the item itself when absent
    #[serde(default)]
    pub link: Option<Css>,
    #[serde(default)]
    pub title: Option<Css>,
    #[serde(default)]
    pub qualification: Option<Css>,
    #[serde(default)]
    pub location: Option<Css>,
    #[serde(default)]
    pub level: Option<Css>,
    /// Query parameter carrying the real target when listing links go
    /// through a search redirect
    #[serde(default)]
    pub link_param: Option<String>,
    #[serde(default)]
    pub next_page: Option<Css>,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

fn default_max_pages() -> usize {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonListing {
    /// JSON pointer to the array of results, e.g. "/response/resultPacket/results"
    pub results: String,
    #[serde(default = "default_url_key")]
    pub url_key: String,
    #[serde(default = "default_title_key")]
    pub title_key: String,
}

fn default_url_key() -> String {
    "liveUrl".to_string()
}

fn default_title_key() -> String {
    "title".to_string()
}

/// Selectors for every canonical field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldRules {
    /// Elements whose text names the qualification a fragment belongs to
    /// (accordion labels, variant headings)
    #[serde(default)]
    pub qualification_labels: Option<Css>,
    /// Where to look for qualification tokens when the listing gave none
    #[serde(default)]
    pub qualification_source: SelectorChain,
    #[serde(default)]
    pub title: SelectorChain,
    #[serde(default)]
    pub university_title: SelectorChain,
    #[serde(default)]
    pub description: SelectorChain,
    #[serde(default)]
    pub about: SelectorChain,
    #[serde(default)]
    pub entry_requirements: SelectorChain,
    #[serde(default)]
    pub locations: LocationRules,
    #[serde(default)]
    pub start_dates: DateRules,
    #[serde(default)]
    pub application_dates: ApplicationDateRules,
    #[serde(default)]
    pub language: LanguageRules,
    #[serde(default)]
    pub modules: ModuleRules,
    #[serde(default)]
    pub tuitions: TuitionRules,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationRules {
    #[serde(default)]
    pub items: SelectorChain,
    /// When set, matched items are labels ("Location", "Lleoliad") and the
    /// value is the following sibling element
    #[serde(default)]
    pub label_keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRules {
    #[serde(default)]
    pub items: SelectorChain,
    /// Definition-list term to fall back on, e.g. "Start date"
    #[serde(default)]
    pub term: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationDateRules {
    #[serde(default)]
    pub sections: SelectorChain,
    /// Keep at most this many dates from the section
    #[serde(default)]
    pub limit: Option<usize>,
    /// Fall back to the site-wide deadlines cache
    #[serde(default = "default_true")]
    pub use_default: bool,
}

impl Default for ApplicationDateRules {
    fn default() -> Self {
        Self { sections: SelectorChain::default(), limit: None, use_default: true }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageRules {
    #[serde(default)]
    pub sections: SelectorChain,
    #[serde(default = "default_tests")]
    pub tests: Vec<String>,
    /// Expand an IELTS band into the cached table of equivalent tests
    #[serde(default)]
    pub use_equivalents: bool,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for LanguageRules {
    fn default() -> Self {
        Self {
            sections: SelectorChain::default(),
            tests: default_tests(),
            use_equivalents: false,
            language: default_language(),
        }
    }
}

fn default_tests() -> Vec<String> {
    vec!["IELTS".to_string(), "TOEFL".to_string()]
}

fn default_language() -> String {
    "English".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleRules {
    #[serde(default)]
    pub items: SelectorChain,
    /// Expand each matched item into these children (e.g. `li` of a `ul`)
    #[serde(default)]
    pub list_items: Option<Css>,
    /// Heading whose keywords set the module type; h3-h6 when absent
    #[serde(default)]
    pub type_heading: Option<Css>,
    /// Heading naming the degree a module list belongs to; h3 when absent
    #[serde(default)]
    pub degree_heading: Option<Css>,
    /// Keep only the text before this separator as the title
    #[serde(default)]
    pub title_separator: Option<String>,
    #[serde(default = "default_module_type")]
    pub default_type: String,
    /// Degree headings containing this marker apply to every qualification
    #[serde(default = "default_generic_marker")]
    pub generic_marker: String,
}

impl Default for ModuleRules {
    fn default() -> Self {
        Self {
            items: SelectorChain::default(),
            list_items: None,
            type_heading: None,
            degree_heading: None,
            title_separator: None,
            default_type: default_module_type(),
            generic_marker: default_generic_marker(),
        }
    }
}

fn default_module_type() -> String {
    "Compulsory".to_string()
}

fn default_generic_marker() -> String {
    "modules".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TuitionRules {
    #[serde(default)]
    pub categories: Vec<CategoryRule>,
    /// Cell naming the student category when a category has no fixed label
    #[serde(default)]
    pub category_cell: Option<Css>,
    /// Rows whose category text contains none of these are skipped
    #[serde(default)]
    pub category_keywords: Vec<String>,
    /// Category given to fees in rows that name no category ("MSc fees");
    /// such rows are skipped when absent
    #[serde(default)]
    pub shared_category: Option<String>,
    /// Category cells marking a shared fee row besides the qualification
    /// itself, e.g. "fee"
    #[serde(default)]
    pub shared_row_keywords: Vec<String>,
    /// Element before a shared-row fee naming its category; `strong` when absent
    #[serde(default)]
    pub item_category: Option<Css>,
    /// Fee-bearing elements inside a row; `li, p, td` when absent
    #[serde(default)]
    pub fee_items: Option<Css>,
    /// Row header holding the study mode and duration ("Full Time 1 Year")
    #[serde(default)]
    pub header: Option<Css>,
    /// Table header cells naming the study mode of each fee column, in order
    #[serde(default)]
    pub column_headers: Option<Css>,
    /// Non-numeric fees kept verbatim, e.g. "NHS"
    #[serde(default)]
    pub fee_literals: Vec<String>,
    #[serde(default)]
    pub attribution: Attribution,
    /// Page-level duration summary ("MSc: 12 months full-time; ...")
    #[serde(default)]
    pub duration_source: SelectorChain,
    /// Definition-list term whose value is read when no summary matches,
    /// e.g. "Duration"
    #[serde(default)]
    pub duration_term: Option<String>,
    /// Admissions-cycle marker that makes a fee apply to every
    /// qualification; when absent, an academic year ("2024/25") in a label
    /// naming no other qualification
    #[serde(default)]
    pub cycle_marker: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRule {
    pub rows: Css,
    #[serde(default)]
    pub label: Option<String>,
}

/// How a fee item is tied to a qualification on multi-qualification pages.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attribution {
    /// Nearest preceding qualification label (see `qualification_labels`)
    #[default]
    Label,
    /// Nearest preceding emphasis, then heading, with the admissions-cycle
    /// marker accepted as a wildcard
    Emphasis {
        #[serde(default)]
        emphasis: Option<Css>,
        #[serde(default)]
        heading: Option<Css>,
    },
}
