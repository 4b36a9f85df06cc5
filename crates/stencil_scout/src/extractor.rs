//! Regex field extraction
//!
//! Each extractor runs case-insensitively over an element's value and collects
//! every non-overlapping match. A regex with capture groups contributes its first
//! group per match, a regex without groups contributes the whole match. Fields
//! that match nothing are left out of the result.

use crate::types::{ExtractedFields, ExtractorSpec};
use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Extractor with its regex compiled
#[derive(Debug, Clone)]
struct CompiledExtractor {
    field: String,
    regex: Regex,
}

/// Compiled extractor list for one template
#[derive(Debug, Clone, Default)]
pub struct FieldExtractor {
    extractors: Vec<CompiledExtractor>,
    /// Fields whose regex failed to compile, with the compile error
    invalid: Vec<(String, String)>,
}

impl FieldExtractor {
    /// Compile extractors. A regex that does not compile is logged and skipped,
    /// so its field never appears in the output.
    pub fn new(specs: &[ExtractorSpec]) -> Self {
        let mut extractors = Vec::with_capacity(specs.len());
        let mut invalid = Vec::new();

        for spec in specs {
            match compile_regex(&spec.regex) {
                Ok(regex) => extractors.push(CompiledExtractor {
                    field: spec.field.clone(),
                    regex,
                }),
                Err(e) => {
                    warn!(field = %spec.field, regex = %spec.regex, error = %e, "Skipping extractor with invalid regex");
                    invalid.push((spec.field.clone(), e.to_string()));
                }
            }
        }

        Self {
            extractors,
            invalid,
        }
    }

    /// Run every extractor against `value_text`.
    pub fn extract(&self, value_text: &str) -> ExtractedFields {
        let mut fields = ExtractedFields::new();
        for extractor in &self.extractors {
            let captures = find_all(&extractor.regex, value_text);
            if captures.is_empty() {
                continue;
            }
            fields.insert(extractor.field.clone(), captures);
        }
        fields
    }

    /// Fields dropped because their regex did not compile
    pub fn invalid_fields(&self) -> &[(String, String)] {
        &self.invalid
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

fn compile_regex(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Every non-overlapping match: group 1 when the regex has groups, else group 0.
fn find_all(regex: &Regex, text: &str) -> Vec<String> {
    // captures_len counts the implicit whole-match group
    let group = if regex.captures_len() > 1 { 1 } else { 0 };
    regex
        .captures_iter(text)
        .map(|caps| {
            caps.get(group)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        })
        .collect()
}

/// One-shot extraction without keeping the compiled extractors around.
pub fn extract(value_text: &str, extractors: &[ExtractorSpec]) -> ExtractedFields {
    FieldExtractor::new(extractors).extract(value_text)
}
