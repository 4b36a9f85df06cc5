//! Plain-text summary of scan results

use crate::describe::{collapse_whitespace, MARKUP_TAG};
use crate::types::{MatchRecord, ScanResult};
use std::fmt::Write;

const RULE_WIDTH: usize = 60;

/// Remove markup tags and `&nbsp;` from a cell value for display.
///
/// Text without both `<` and `>` is returned unchanged.
pub fn clean_html_content(text: &str) -> String {
    if !(text.contains('<') && text.contains('>')) {
        return text.to_string();
    }
    let text = MARKUP_TAG.replace_all(text, " ");
    let text = collapse_whitespace(&text);
    collapse_whitespace(&text.replace("&nbsp;", " "))
}

/// One line per record: `- ID: <id> field: value ...`, skipping values that
/// are empty once cleaned.
pub fn record_line(record: &MatchRecord) -> String {
    let mut line = format!("- ID: {}", record.id);
    for (field, values) in record.extracted_fields.iter() {
        for value in values {
            let clean = clean_html_content(value);
            if !clean.trim().is_empty() {
                let _ = write!(line, " {}: {}", field, clean);
            }
        }
    }
    line
}

/// Summary report over every template, including those without matches.
pub fn summary_report(result: &ScanResult) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "STENCIL SUMMARY REPORT");
    let _ = writeln!(out, "{}", rule);

    for (template, records) in result.iter() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Template: {}", template);
        for record in records {
            let _ = writeln!(out, "  {}", record_line(record));
        }
        let _ = writeln!(out, "  Objects found: {}", records.len());
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "TOTAL: {} objects found", result.total_matches());
    let _ = writeln!(out, "{}", rule);
    out
}
