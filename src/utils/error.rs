// src/utils/error.rs
use thiserror::Error;

// Errors from the page-fetching side of the crawl
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error {status} for {url}")]
    Http { status: reqwest::StatusCode, url: String },

    #[error("Site rate limit likely exceeded for {0}")]
    RateLimited(String),

    #[error("Page not found: {0}")]
    NotFound(String),
}

/// Fail-soft conditions raised inside the engine.
///
/// None of these ever reach the crawl loop: each is logged where it is
/// detected and resolved to the field's default (or, for
/// `SchemaViolation`, to a dropped record).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("No match for {field} (tried {tried})")]
    StructuralMiss { field: &'static str, tried: String },

    #[error("Fragment '{fragment}' could not be attributed to {qualification}")]
    AmbiguousQualification { fragment: String, qualification: String },

    #[error("Reference cache '{0}' was never populated")]
    CacheUnavailable(&'static str),

    #[error("Record is missing required field '{0}'")]
    SchemaViolation(&'static str),
}

impl ExtractError {
    pub fn miss(field: &'static str, tried: impl Into<String>) -> Self {
        ExtractError::StructuralMiss { field, tried: tried.into() }
    }
}

// Rule set loading: every selector and pattern is validated up front
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Invalid CSS selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },

    #[error("Invalid pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("Could not read rule set {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("Malformed rule set: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Fetching failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Rule set error: {0}")]
    Rules(#[from] RuleError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Run produced no records: {0}")]
    Processing(String),
}
