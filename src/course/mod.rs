// src/course/mod.rs
use serde::{Deserialize, Serialize};

use crate::utils::error::ExtractError;

/// A date phrase exactly as the page words it ("15 September 2024",
/// "Sep 2024 or Jan 2025"). Deliberately never parsed further.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Date {
    pub value: String,
}

impl Date {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub value: String,
}

impl Location {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageRequirement {
    pub language: String,
    pub test: Option<String>,
    pub score: Option<String>,
}

impl LanguageRequirement {
    pub fn english(test: impl Into<String>, score: impl Into<String>) -> Self {
        Self {
            language: "English".to_string(),
            test: Some(test.into()),
            score: Some(score.into()),
        }
    }
}

impl Default for LanguageRequirement {
    fn default() -> Self {
        Self { language: "English".to_string(), test: None, score: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    #[serde(rename = "type")]
    pub module_type: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
}

/// One fee line. `fee` keeps its currency symbol and formatting; literals
/// such as "NHS funded" pass through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tuition {
    pub study_mode: Option<String>,
    pub duration: Option<String>,
    pub student_category: Option<String>,
    pub fee: Option<String>,
}

/// The canonical record for one (page, qualification) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub link: Option<String>,
    pub title: String,
    pub study_level: Option<String>,
    pub qualification: Option<String>,
    pub university_title: String,
    pub locations: Vec<Location>,
    pub description: Option<String>,
    pub about: Option<String>,
    pub start_dates: Vec<Date>,
    pub application_dates: Vec<Date>,
    pub entry_requirements: Option<String>,
    pub language_requirements: Vec<LanguageRequirement>,
    pub modules: Vec<Module>,
    pub tuitions: Vec<Tuition>,
}

impl Course {
    /// Enforces the record invariants: both titles present and no repeated
    /// locations or start dates. Consumes the draft so an invalid record
    /// can't be emitted by accident.
    pub fn validate(mut self) -> Result<Course, ExtractError> {
        if self.title.trim().is_empty() {
            return Err(ExtractError::SchemaViolation("title"));
        }
        if self.university_title.trim().is_empty() {
            return Err(ExtractError::SchemaViolation("university_title"));
        }
        self.locations = dedup(std::mem::take(&mut self.locations));
        self.start_dates = dedup(std::mem::take(&mut self.start_dates));
        Ok(self)
    }
}

/// Appends `item` unless an equal value is already present.
pub fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

/// Order-preserving de-duplication.
pub fn dedup<T: PartialEq>(items: Vec<T>) -> Vec<T> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        push_unique(&mut out, item);
    }
    out
}
