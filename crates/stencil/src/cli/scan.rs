//! Scan command - match templates against one document or a directory of them
//!
//! A document that cannot be loaded is reported alongside the others and
//! makes the command exit non-zero once every document has been tried.

use crate::cli::config::resolve_policy;
use crate::cli::error::HelpfulError;
use crate::cli::list::discover_documents;
use crate::cli::output::{count_color, print_table_colored};
use crate::cli::templates::load_templates;
use comfy_table::Color;
use serde::Serialize;
use std::path::{Path, PathBuf};
use stencil_scout::report::summary_report;
use stencil_scout::{
    AndDelimiter, BatchReport, ScanPolicy, ScanResult, Scanner, SearchTextMode, TemplateSet,
};
use tracing::info;

#[derive(Debug)]
pub struct ScanArgs {
    pub path: PathBuf,
    pub templates: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub delimiter: Option<char>,
    pub all_cells: bool,
    pub attributes: bool,
    pub recursive: bool,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Serialize)]
struct DocumentJson<'a> {
    path: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<&'a ScanResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ScanOutput<'a> {
    documents: Vec<DocumentJson<'a>>,
    total_matches: usize,
    failures: usize,
}

pub fn run(args: ScanArgs) -> anyhow::Result<()> {
    if !args.path.exists() {
        return Err(HelpfulError::path_not_found(&args.path).into());
    }

    let policy = apply_overrides(resolve_policy(args.config.as_deref())?.policy, &args)?;
    let (template_path, templates) = load_templates(args.templates.as_deref())?;

    let documents = if args.path.is_dir() {
        let found = discover_documents(&args.path, args.recursive);
        if found.is_empty() {
            return Err(HelpfulError::no_documents(&args.path).into());
        }
        found
    } else {
        vec![args.path.clone()]
    };

    info!(
        documents = documents.len(),
        templates = templates.len(),
        template_file = %template_path.display(),
        "Starting scan"
    );

    let scanner = Scanner::with_policy(policy);
    let report = scanner.scan_batch(&documents, templates.templates());

    if args.json {
        output_json(&report)?;
    } else if args.quiet {
        output_quiet(&report);
    } else {
        output_text(&report, &templates);
    }

    if report.has_failures() {
        return Err(HelpfulError::documents_failed(report.failure_count(), report.documents.len()).into());
    }
    Ok(())
}

/// Command-line flags take precedence over the config file.
fn apply_overrides(mut policy: ScanPolicy, args: &ScanArgs) -> anyhow::Result<ScanPolicy> {
    if let Some(c) = args.delimiter {
        policy.and_delimiter = AndDelimiter::from_char(c).ok_or_else(|| HelpfulError::invalid_delimiter(c))?;
    }
    if args.all_cells {
        policy.stencil_filter = false;
    }
    if args.attributes {
        policy.search_text = SearchTextMode::Attributes;
    }
    Ok(policy)
}

fn output_json(report: &BatchReport) -> anyhow::Result<()> {
    let documents = report
        .documents
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(result) => DocumentJson {
                path: &outcome.path,
                results: Some(result),
                error: None,
            },
            Err(err) => DocumentJson {
                path: &outcome.path,
                results: None,
                error: Some(err.to_string()),
            },
        })
        .collect();

    let output = ScanOutput {
        documents,
        total_matches: total_matches(report),
        failures: report.failure_count(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn output_quiet(report: &BatchReport) {
    for outcome in &report.documents {
        match &outcome.result {
            Ok(result) => println!("{}: {} match(es)", outcome.path.display(), result.total_matches()),
            Err(err) => println!("{}: FAILED ({})", outcome.path.display(), err),
        }
    }
}

fn output_text(report: &BatchReport, templates: &TemplateSet) {
    for outcome in &report.documents {
        println!();
        println!("Document: {}", outcome.path.display());

        let result = match &outcome.result {
            Ok(result) => result,
            Err(err) => {
                print_table_colored(
                    &["Status", "Reason"],
                    vec![vec![("FAILED".to_string(), Some(Color::Red)), (err.to_string(), None)]],
                );
                continue;
            }
        };

        let rows = result
            .iter()
            .map(|(name, records)| {
                let schema = templates.get(name).map(|t| t.schema()).unwrap_or_default();
                vec![
                    (name.to_string(), None),
                    (schema.to_string(), None),
                    (records.len().to_string(), count_color(records.len())),
                ]
            })
            .collect();
        print_table_colored(&["Template", "Schema", "Matches"], rows);
        print!("{}", summary_report(result));
    }

    if report.documents.len() > 1 {
        println!();
        println!(
            "Scanned {} document(s): {} match(es), {} failure(s)",
            report.documents.len(),
            total_matches(report),
            report.failure_count()
        );
    }
}

fn total_matches(report: &BatchReport) -> usize {
    report.succeeded().map(|(_, r)| r.total_matches()).sum()
}
