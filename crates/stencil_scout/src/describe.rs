//! Post-processing hooks run on a match after field extraction.
//!
//! The built-in [`DescriptionDeriver`] turns whatever text is left in a cell's
//! value, once extracted fields and markup are removed, into a `description`
//! field. Network segment shapes typically carry an address range plus a free
//! text label; the label is what ends up in `description`.

use crate::types::{CandidateElement, ExtractedFields, Template};
use once_cell::sync::Lazy;
use regex::Regex;

/// Field name written by [`DescriptionDeriver`]
pub const DESCRIPTION_FIELD: &str = "description";

pub(crate) static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<]+?>").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Hook applied to the extracted fields of a matched element.
pub trait MatchPostProcessor: Send + Sync {
    /// Name used in logs and diagnostics
    fn name(&self) -> &str;

    fn process(&self, template: &Template, candidate: &CandidateElement, fields: &mut ExtractedFields);
}

/// Derives a `description` field from the value text not claimed by other fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptionDeriver;

impl MatchPostProcessor for DescriptionDeriver {
    fn name(&self) -> &str {
        "description"
    }

    fn process(&self, _template: &Template, candidate: &CandidateElement, fields: &mut ExtractedFields) {
        let captured: Vec<String> = fields.values().map(str::to_string).collect();
        if let Some(description) = derive_description(&candidate.value, &captured) {
            fields.insert(DESCRIPTION_FIELD, vec![description]);
        }
    }
}

/// Strip captured text and markup from `value`; `None` if nothing readable is left.
pub fn derive_description(value: &str, captured: &[String]) -> Option<String> {
    // Longest first, so a capture that prefixes another cannot split it
    let mut captures: Vec<&str> = captured.iter().map(String::as_str).filter(|c| !c.is_empty()).collect();
    captures.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut text = value.to_string();
    for capture in captures {
        text = text.replace(capture, "");
    }

    let text = MARKUP_TAG.replace_all(&text, " ");
    let text = collapse_whitespace(&text);
    let text = collapse_whitespace(&text.replace("&nbsp;", " "));

    if has_meaningful_chars(&text) {
        Some(text)
    } else {
        None
    }
}

/// At least one letter or digit, in any script
fn has_meaningful_chars(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").trim().to_string()
}
