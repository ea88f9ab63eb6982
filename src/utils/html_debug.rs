// src/utils/html_debug.rs
use std::fs::File;
use std::io::Write;
use std::path::Path;

use regex::Regex;

use crate::extractors::patterns::highlight_patterns;
use crate::utils::error::{AppError, RuleError};

/// Saves a page to a file with the given byte ranges highlighted.
/// Ranges overlapping an earlier highlight are skipped.
pub fn save_debug_html(html: &str, path: &Path, highlights: &[(usize, usize, &str)]) -> Result<(), AppError> {
    let mut file = File::create(path)?;

    let mut debug_html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<style>\n");

    // CSS for highlight colors
    debug_html.push_str(".highlight-date { background-color: #FFFF00; }\n");
    debug_html.push_str(".highlight-fee { background-color: #90EE90; }\n");
    debug_html.push_str(".highlight-score { background-color: #ADD8E6; }\n");
    debug_html.push_str(".highlight-duration { background-color: #FFA500; }\n");
    debug_html.push_str(".highlight-mode { background-color: #DDA0DD; }\n");
    debug_html.push_str(".highlight-custom { background-color: #FFC0CB; }\n");
    debug_html.push_str("</style>\n</head>\n<body>\n");

    let mut last_pos = 0;
    let mut sorted_highlights = highlights.to_vec();
    sorted_highlights.sort_by_key(|h| (h.0, std::cmp::Reverse(h.1)));

    for (start, end, highlight_type) in sorted_highlights {
        if start < last_pos || end > html.len() {
            continue;
        }
        debug_html.push_str(&html[last_pos..start]);

        let css_class = match highlight_type {
            "date" => "highlight-date",
            "fee" => "highlight-fee",
            "score" => "highlight-score",
            "duration" => "highlight-duration",
            "mode" => "highlight-mode",
            _ => "highlight-custom",
        };

        debug_html.push_str(&format!(
            "<span class=\"{}\" title=\"Position: {}-{}, Type: {}\">",
            css_class, start, end, highlight_type
        ));
        debug_html.push_str(&html[start..end]);
        debug_html.push_str("</span>");

        last_pos = end;
    }

    debug_html.push_str(&html[last_pos..]);
    debug_html.push_str("\n</body>\n</html>");

    file.write_all(debug_html.as_bytes())?;

    tracing::info!("Saved debug HTML to {}", path.display());
    Ok(())
}

/// Creates a debug copy of a fetched page with every pattern-library hit
/// highlighted, plus any extra patterns given on the command line.
pub fn create_debug_html(html: &str, path: &Path, extra_patterns: &[String]) -> Result<(), AppError> {
    let mut highlights = Vec::new();

    for (re, highlight_type) in highlight_patterns() {
        for mat in re.find_iter(html) {
            highlights.push((mat.start(), mat.end(), highlight_type));
        }
    }

    for pattern in extra_patterns {
        let re = Regex::new(pattern).map_err(|e| RuleError::Pattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        for mat in re.find_iter(html) {
            highlights.push((mat.start(), mat.end(), "custom"));
        }
    }

    save_debug_html(html, path, &highlights)
}
