// src/extractors/fields/mod.rs

//! One extractor per canonical field. Each is a pure function of the page,
//! the site rules and the qualification being assembled, and reports a
//! miss as an `ExtractError` that the assembler turns into the field's
//! empty default.

pub mod dates;
pub mod language;
pub mod locations;
pub mod modules;
pub mod text;
pub mod tuition;

use scraper::Html;

use crate::extractors::disambiguator::Disambiguator;
use crate::extractors::document::CoursePage;
use crate::extractors::reference::ReferenceCache;
use crate::rules::{FieldRules, SiteRules};
use crate::utils::error::ExtractError;

/// Everything an extractor may look at for one (page, qualification) pair.
#[derive(Clone, Copy)]
pub struct FieldContext<'a> {
    pub page: &'a CoursePage,
    pub site: &'a SiteRules,
    pub cache: &'a ReferenceCache,
    pub qualification: &'a str,
    /// The page advertises more than one qualification
    pub multiple: bool,
}

impl<'a> FieldContext<'a> {
    pub fn html(&self) -> &'a Html {
        &self.page.html
    }

    pub fn rules(&self) -> &'a FieldRules {
        &self.site.fields
    }

    pub fn disambiguator(&self) -> Disambiguator<'a> {
        Disambiguator::new(self.site.fields.qualification_labels.as_ref())
    }
}

/// Resolves an extractor result to a value, logging whatever went wrong.
pub fn soft<T: Default>(field: &'static str, result: Result<T, ExtractError>) -> T {
    match result {
        Ok(value) => value,
        Err(err @ ExtractError::CacheUnavailable(_)) => {
            tracing::warn!("{}: {}", field, err);
            T::default()
        }
        Err(err) => {
            tracing::debug!("{}: {}", field, err);
            T::default()
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::crawl::models::CourseRequest;
    use crate::extractors::document::CoursePage;
    use crate::rules::SiteRules;

    pub fn page(body: &str) -> CoursePage {
        CoursePage::parse(body, CourseRequest::new("https://example.ac.uk/course"))
    }

    /// Rule set with only the given `fields` block filled in.
    pub fn rules(fields_json: &str) -> SiteRules {
        let json = format!(
            r#"{{ "site_id": "test", "university_title": "Test University", "fields": {} }}"#,
            fields_json
        );
        SiteRules::from_json(&json).expect("test rule set")
    }
}
