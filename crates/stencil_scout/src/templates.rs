//! Template file loading
//!
//! Templates live in a YAML file (JSON works too, being a YAML subset) keyed by
//! template name, in the order the scan reports them:
//!
//! ```yaml
//! Network:
//!   patterns:
//!     - "shape=stencil(;network"
//!   parsers:
//!     - ip: '\d+\.\d+\.\d+\.\d+(?:/\d+)?'
//!   schema: net
//!   descriptive: true
//! ```
//!
//! Entries with missing or malformed keys are kept but degraded (a template
//! without `patterns` never matches) and reported as diagnostics.

use crate::error::{Result, ScoutError};
use crate::types::{ExtractorSpec, Template};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::path::Path;
use tracing::{info, warn};

/// File name looked up when no template file is given
pub const DEFAULT_TEMPLATE_FILE: &str = "stencil_templates.yaml";

/// Something wrong with one template entry that did not stop loading
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateDiagnostic {
    pub template: String,
    pub message: String,
}

/// Templates in file order
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: Vec<Template>,
    diagnostics: Vec<TemplateDiagnostic>,
}

impl TemplateSet {
    pub fn from_templates(templates: Vec<Template>) -> Self {
        Self {
            templates,
            diagnostics: Vec::new(),
        }
    }

    /// Load templates from a YAML or JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ScoutError::TemplateFileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let set = Self::from_yaml_str(&content)?;
        info!(
            path = %path.display(),
            templates = set.len(),
            diagnostics = set.diagnostics.len(),
            "Loaded templates"
        );
        Ok(set)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let value: Value =
            serde_yaml::from_str(content).map_err(|e| ScoutError::TemplateLoad(e.to_string()))?;

        let mapping = match value {
            Value::Mapping(mapping) => mapping,
            Value::Null => {
                return Err(ScoutError::TemplateLoad("template file is empty".to_string()))
            }
            other => {
                return Err(ScoutError::TemplateLoad(format!(
                    "expected a mapping of template names, found {}",
                    value_kind(&other)
                )))
            }
        };

        let mut set = Self::default();
        for (key, entry) in &mapping {
            let Some(name) = scalar_to_string(key) else {
                set.diagnose("<invalid>", format!("template name must be a scalar, found {}", value_kind(key)));
                continue;
            };
            let template = set.parse_entry(name, entry);
            set.templates.push(template);
        }

        Ok(set)
    }

    fn parse_entry(&mut self, name: String, entry: &Value) -> Template {
        let Value::Mapping(config) = entry else {
            self.diagnose(&name, format!("template entry must be a mapping, found {}", value_kind(entry)));
            return Template::without_patterns(name);
        };

        let mut template = match self.parse_patterns(&name, config) {
            Some(patterns) => Template::new(name.clone()).with_patterns(patterns),
            None => Template::without_patterns(name.clone()),
        };

        for key in ["parsers", "extractors"] {
            if let Some(value) = config.get(key) {
                for spec in self.parse_extractors(&name, key, value) {
                    template = template.with_extractor(spec.field, spec.regex);
                }
            }
        }

        if let Some(schema) = config.get("schema") {
            match scalar_to_string(schema) {
                Some(schema) => template = template.with_schema(schema),
                None => self.diagnose(&name, "schema must be a scalar; using default"),
            }
        }

        match config.get("descriptive") {
            None => {}
            Some(Value::Bool(flag)) => template = template.descriptive(*flag),
            Some(other) => {
                self.diagnose(&name, format!("descriptive must be a boolean, found {}", value_kind(other)))
            }
        }

        template
    }

    fn parse_patterns(&mut self, name: &str, config: &Mapping) -> Option<Vec<String>> {
        match config.get("patterns") {
            None | Some(Value::Null) => {
                self.diagnose(name, "missing `patterns`; template will never match");
                None
            }
            Some(Value::Sequence(items)) => {
                let mut patterns = Vec::with_capacity(items.len());
                for item in items {
                    match scalar_to_string(item) {
                        Some(p) => patterns.push(p),
                        None => self.diagnose(name, format!("ignoring non-scalar pattern ({})", value_kind(item))),
                    }
                }
                Some(patterns)
            }
            Some(other) => match scalar_to_string(other) {
                Some(p) => Some(vec![p]),
                None => {
                    self.diagnose(name, "`patterns` must be a list; template will never match");
                    None
                }
            },
        }
    }

    fn parse_extractors(&mut self, name: &str, key: &str, value: &Value) -> Vec<ExtractorSpec> {
        let mut specs = Vec::new();
        match value {
            Value::Null => {}
            Value::Sequence(items) => {
                for item in items {
                    match item {
                        Value::Mapping(pairs) => self.collect_pairs(name, pairs, &mut specs),
                        other => self.diagnose(
                            name,
                            format!("`{}` items must be `field: regex` mappings, found {}", key, value_kind(other)),
                        ),
                    }
                }
            }
            Value::Mapping(pairs) => self.collect_pairs(name, pairs, &mut specs),
            other => self.diagnose(name, format!("`{}` must be a list, found {}", key, value_kind(other))),
        }
        specs
    }

    fn collect_pairs(&mut self, name: &str, pairs: &Mapping, specs: &mut Vec<ExtractorSpec>) {
        for (field, regex) in pairs {
            match (scalar_to_string(field), scalar_to_string(regex)) {
                (Some(field), Some(regex)) => specs.push(ExtractorSpec::new(field, regex)),
                _ => self.diagnose(name, "extractor field and regex must both be scalars"),
            }
        }
    }

    fn diagnose(&mut self, template: &str, message: impl Into<String>) {
        let message = message.into();
        warn!(template = %template, "{}", message);
        self.diagnostics.push(TemplateDiagnostic {
            template: template.to_string(),
            message,
        });
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name() == name)
    }

    pub fn diagnostics(&self) -> &[TemplateDiagnostic] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        _ => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
