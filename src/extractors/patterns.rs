// src/extractors/patterns.rs

//! Text matchers shared by every field extractor.
//!
//! All matchers are total: "no match" is `None`, never an error. Matches
//! borrow from the input so callers decide when to allocate.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

const LONG_MONTHS: &str =
    "January|February|March|April|May|June|July|August|September|October|November|December";
const SHORT_MONTHS: &str = "Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec";
const NUMBER_WORDS: &str = "one|two|three|four|five|six|seven|eight|nine|ten";

/// Degree abbreviations recognised in titles and listing text.
pub const QUALIFICATION_VOCABULARY: &[&str] = &[
    "MSc", "PGCert", "PGDip", "MA", "MBA", "MPhil", "LLM", "PhD", "EdD", "JD", "MSW", "MPA",
    "MPAS", "MAcc", "EMBA", "MFA", "MD", "PsyD", "DPT", "DBA", "DEng", "DSc", "DSW", "DDS",
    "MBBCh",
];

// --- Regex Patterns (Lazy Static) ---

// "15 September 2024", "1st August 2024", "Sep 2024", "Jan 2025 or Sep 2025"
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    let long = format!(r"\b\d{{1,2}}(?:st|nd|rd|th)?\s*(?:{LONG_MONTHS})\s*\d{{4}}\b");
    let short = format!(r"\b(?:\d{{1,2}}(?:st|nd|rd|th)?\s+)?(?:{SHORT_MONTHS})\s\d{{4}}\b");
    let single = format!("(?:{long}|{short})");
    Regex::new(&format!(r"(?i){single}(?:\s+or\s+{single})?")).expect("DATE_RE regex")
});

static IELTS_SCORE_RE: Lazy<Regex> = Lazy::new(|| score_regex("IELTS").expect("IELTS_SCORE_RE regex"));
static TOEFL_SCORE_RE: Lazy<Regex> = Lazy::new(|| score_regex("TOEFL").expect("TOEFL_SCORE_RE regex"));

static TRAILING_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*$").expect("TRAILING_NUMBER_RE regex"));

static FEE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[£€]\d+(?:,\d{3})*(?:\.\d{2})?").expect("FEE_RE regex"));

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:{NUMBER_WORDS}|\d+(?:\.\d+)?)\s+(?:weeks?|months?|years?|blwyddyn|blynedd)\b"
    ))
    .expect("DURATION_RE regex")
});

// English plus the Welsh forms used on bilingual sites (Llawn Amser / Rhan Amser)
static STUDY_MODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:full|part|llawn|rhan)(?:-|\s)?(?:time|amser)\b").expect("STUDY_MODE_RE regex")
});

static ACADEMIC_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}/(?:\d{4}|\d{2})\b").expect("ACADEMIC_YEAR_RE regex"));

static QUALIFICATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\b(?:{})\b", QUALIFICATION_VOCABULARY.join("|"))).expect("QUALIFICATION_RE regex")
});

// "MSc: 12 months full-time; PgDip: 9 months full-time"
static DURATION_ENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)(?:(?P<qualification>[A-Za-z]+)\s*:\s*)?(?P<duration>\b(?:{NUMBER_WORDS}|\d+(?:\.\d+)?)\s+(?:weeks?|months?|years?))\s+(?P<mode>(?:full|part)[- ]?time)"
    ))
    .expect("DURATION_ENTRY_RE regex")
});

fn score_regex(test: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?i)\b{}\b.*?\d+(?:\.\d+)?", regex::escape(test))).ok()
}

// --- Matchers ---

/// Leftmost date phrase, including an "or <date>" alternative.
pub fn match_date(text: &str) -> Option<&str> {
    DATE_RE.find(text).map(|m| m.as_str())
}

/// Every non-overlapping date phrase, in text order.
pub fn find_dates(text: &str) -> Vec<&str> {
    DATE_RE.find_iter(text).map(|m| m.as_str()).collect()
}

/// `<TEST> ... <number>`; the returned phrase ends with the score.
pub fn match_test_score<'t>(text: &'t str, test: &str) -> Option<&'t str> {
    let compiled;
    let re: &Regex = if test.eq_ignore_ascii_case("IELTS") {
        &IELTS_SCORE_RE
    } else if test.eq_ignore_ascii_case("TOEFL") {
        &TOEFL_SCORE_RE
    } else {
        compiled = score_regex(test)?;
        &compiled
    };
    re.find(text).map(|m| m.as_str())
}

/// Numeric group at the end of a phrase from [`match_test_score`].
pub fn score_of(phrase: &str) -> Option<&str> {
    TRAILING_NUMBER_RE
        .captures(phrase)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Band key form used by equivalence tables: "7" becomes "7.0".
pub fn normalize_ielts_key(score: &str) -> String {
    if score.contains('.') {
        score.to_string()
    } else {
        format!("{score}.0")
    }
}

pub fn match_fee(text: &str) -> Option<&str> {
    FEE_RE.find(text).map(|m| m.as_str())
}

pub fn match_duration(text: &str) -> Option<&str> {
    DURATION_RE.find(text).map(|m| m.as_str())
}

pub fn match_study_mode(text: &str) -> Option<&str> {
    STUDY_MODE_RE.find(text).map(|m| m.as_str())
}

/// Maps any recognised study-mode phrase to "Full-time" or "Part-time".
pub fn canonical_study_mode(phrase: &str) -> Option<&'static str> {
    let lower = phrase.trim().to_lowercase();
    if lower.starts_with("full") || lower.starts_with("llawn") {
        Some("Full-time")
    } else if lower.starts_with("part") || lower.starts_with("rhan") {
        Some("Part-time")
    } else {
        None
    }
}

pub fn match_academic_year(text: &str) -> Option<&str> {
    ACADEMIC_YEAR_RE.find(text).map(|m| m.as_str())
}

/// Known degree tokens in order of first appearance, without repeats.
pub fn recognize_qualifications(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for m in QUALIFICATION_RE.find_iter(text) {
        if !found.iter().any(|q| q == m.as_str()) {
            found.push(m.as_str().to_string());
        }
    }
    found
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationEntry {
    pub duration: String,
    pub study_mode: String,
}

/// Page-level duration summary keyed by lower-cased qualification, each
/// key holding its entries in page order. An entry without a
/// qualification prefix is stored under "".
pub fn match_duration_map(text: &str) -> BTreeMap<String, Vec<DurationEntry>> {
    let mut map: BTreeMap<String, Vec<DurationEntry>> = BTreeMap::new();
    for caps in DURATION_ENTRY_RE.captures_iter(text) {
        let key = caps
            .name("qualification")
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default();
        let (Some(duration), Some(mode)) = (caps.name("duration"), caps.name("mode")) else {
            continue;
        };
        map.entry(key).or_default().push(DurationEntry {
            duration: duration.as_str().to_string(),
            study_mode: mode.as_str().to_string(),
        });
    }
    map
}

/// Patterns highlighted in debug dumps of fetched pages.
pub fn highlight_patterns() -> Vec<(&'static Regex, &'static str)> {
    vec![
        (&*DATE_RE, "date"),
        (&*FEE_RE, "fee"),
        (&*IELTS_SCORE_RE, "score"),
        (&*TOEFL_SCORE_RE, "score"),
        (&*DURATION_RE, "duration"),
        (&*STUDY_MODE_RE, "mode"),
    ]
}
