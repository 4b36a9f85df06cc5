//! Templates command - load a template file and report problems

use crate::cli::error::HelpfulError;
use crate::cli::output::print_table_colored;
use comfy_table::Color;
use serde::Serialize;
use std::path::{Path, PathBuf};
use stencil_scout::templates::DEFAULT_TEMPLATE_FILE;
use stencil_scout::{FieldExtractor, Template, TemplateDiagnostic, TemplateSet};

#[derive(Debug)]
pub struct TemplatesArgs {
    pub templates: Option<PathBuf>,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct TemplateSummary<'a> {
    #[serde(flatten)]
    template: &'a Template,
    invalid_extractors: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TemplatesOutput<'a> {
    path: &'a Path,
    templates: Vec<TemplateSummary<'a>>,
    diagnostics: Vec<TemplateDiagnostic>,
}

pub fn run(args: TemplatesArgs) -> anyhow::Result<()> {
    let (path, set) = load_templates(args.templates.as_deref())?;

    let summaries = summarize(&set);
    let diagnostics = all_diagnostics(&set, &summaries);

    if args.json {
        let output = TemplatesOutput {
            path: &path,
            templates: summaries,
            diagnostics,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Templates: {}", path.display());
    let rows = summaries
        .iter()
        .map(|s| {
            let patterns = match s.template.patterns() {
                Some(p) => (p.len().to_string(), None),
                None => ("missing".to_string(), Some(Color::Yellow)),
            };
            let extractors = if s.invalid_extractors.is_empty() {
                (s.template.extractors().len().to_string(), None)
            } else {
                (
                    format!("{} ({} invalid)", s.template.extractors().len(), s.invalid_extractors.len()),
                    Some(Color::Yellow),
                )
            };
            vec![
                (s.template.name().to_string(), None),
                patterns,
                extractors,
                (s.template.schema().to_string(), None),
                (if s.template.is_descriptive() { "yes" } else { "" }.to_string(), None),
            ]
        })
        .collect();
    print_table_colored(&["Template", "Patterns", "Extractors", "Schema", "Descriptive"], rows);

    if diagnostics.is_empty() {
        println!("{} template(s), no problems found", set.len());
    } else {
        println!();
        for d in &diagnostics {
            println!("WARNING: {}: {}", d.template, d.message);
        }
    }

    Ok(())
}

/// Load templates from `explicit`, or from `stencil_templates.yaml` in the
/// working directory.
pub fn load_templates(explicit: Option<&Path>) -> anyhow::Result<(PathBuf, TemplateSet)> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_FILE));
    let set = TemplateSet::load(&path).map_err(|err| HelpfulError::from_template_error(&path, err))?;
    Ok((path, set))
}

fn summarize(set: &TemplateSet) -> Vec<TemplateSummary<'_>> {
    set.iter()
        .map(|template| TemplateSummary {
            template,
            invalid_extractors: FieldExtractor::new(template.extractors())
                .invalid_fields()
                .iter()
                .map(|(field, _)| field.clone())
                .collect(),
        })
        .collect()
}

/// Load diagnostics plus one per extractor whose regex does not compile.
fn all_diagnostics(set: &TemplateSet, summaries: &[TemplateSummary<'_>]) -> Vec<TemplateDiagnostic> {
    let mut diagnostics = set.diagnostics().to_vec();
    for s in summaries {
        for field in &s.invalid_extractors {
            diagnostics.push(TemplateDiagnostic {
                template: s.template.name().to_string(),
                message: format!("extractor '{}' has an invalid regex and will be skipped", field),
            });
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_templates_missing_file() {
        let err = load_templates(Some(Path::new("/nonexistent/templates.yaml"))).unwrap_err();
        let helpful = err.downcast_ref::<HelpfulError>().unwrap();
        assert!(helpful.message.starts_with("Template file not found"));
    }

    #[test]
    fn test_invalid_regex_becomes_diagnostic() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("t.yaml");
        fs::write(
            &path,
            "Broken:\n  patterns: [\"x\"]\n  parsers:\n    - ok: 'a+'\n    - bad: '(unclosed'\n",
        )
        .unwrap();

        let (_, set) = load_templates(Some(&path)).unwrap();
        let summaries = summarize(&set);
        let diagnostics = all_diagnostics(&set, &summaries);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].template, "Broken");
        assert!(diagnostics[0].message.contains("'bad'"));
    }
}
