// src/extractors/disambiguator.rs

//! Attributes page fragments to qualifications on pages that describe
//! several (e.g. "MSc" and "PGDip" variants of one course).

use scraper::{ElementRef, Selector};

use crate::extractors::document::{contains_ci, preceding, text_of, Css};
use crate::utils::error::ExtractError;

/// Decides whether a fragment pertains to a qualification by finding the
/// nearest qualification label before it in the document.
#[derive(Debug, Clone, Copy)]
pub struct Disambiguator<'r> {
    labels: Option<&'r Selector>,
}

impl<'r> Disambiguator<'r> {
    pub fn new(labels: Option<&'r Css>) -> Self {
        Self { labels: labels.map(Css::selector) }
    }

    /// Text of the nearest label element enclosing or preceding `fragment`.
    pub fn label_for(&self, fragment: ElementRef) -> Option<String> {
        let selector = self.labels?;
        preceding(fragment, selector).map(text_of)
    }

    /// On single-qualification pages every fragment is accepted. Otherwise
    /// the fragment needs a label containing the qualification.
    pub fn belongs_to(&self, fragment: ElementRef, qualification: &str, multiple: bool) -> bool {
        if !multiple {
            return true;
        }
        let label = self.label_for(fragment);
        let accepted = accepts_label(label.as_deref(), qualification, true, &[]);
        if !accepted {
            log_rejection(fragment, qualification);
        }
        accepted
    }
}

/// The shared decision once a label has been resolved. `markers` are extra
/// tokens that make a label apply to every qualification ("modules",
/// an admissions year).
pub fn accepts_label(label: Option<&str>, qualification: &str, multiple: bool, markers: &[&str]) -> bool {
    if !multiple {
        return true;
    }
    match label {
        Some(text) => {
            contains_ci(text, qualification) || markers.iter().any(|marker| contains_ci(text, marker))
        }
        None => false,
    }
}

pub fn log_rejection(fragment: ElementRef, qualification: &str) {
    let mut snippet = text_of(fragment);
    if snippet.len() > 60 {
        let cut = (0..=60).rev().find(|i| snippet.is_char_boundary(*i)).unwrap_or(0);
        snippet.truncate(cut);
    }
    let reason = ExtractError::AmbiguousQualification {
        fragment: snippet,
        qualification: qualification.to_string(),
    };
    tracing::trace!("{}", reason);
}
