//! Core types for stencil scanning
//!
//! Templates describe what to look for, candidate elements are the cells pulled
//! out of a diagram, and match records are what a scan hands back.

use crate::pattern::{AndDelimiter, PatternExpr};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

// ============================================================================
// Serde helpers for ordered pairs
// ============================================================================

/// Serialize `[(key, value)]` as a map, keeping the slice order.
fn serialize_pairs<S, V>(pairs: &[(String, V)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize,
{
    let mut map = serializer.serialize_map(Some(pairs.len()))?;
    for (key, value) in pairs {
        map.serialize_entry(key, value)?;
    }
    map.end()
}

// ============================================================================
// Templates
// ============================================================================

/// Schema tag used when a template does not declare one
pub const DEFAULT_SCHEMA: &str = "none";

/// A named regex used to pull one field out of an element's value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractorSpec {
    pub field: String,
    pub regex: String,
}

impl ExtractorSpec {
    pub fn new(field: impl Into<String>, regex: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            regex: regex.into(),
        }
    }
}

/// A stencil template loaded from the template file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    name: String,
    /// `None` when the template entry had no `patterns` key; such a template
    /// never matches.
    patterns: Option<Vec<String>>,
    extractors: Vec<ExtractorSpec>,
    schema: String,
    descriptive: bool,
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            patterns: Some(Vec::new()),
            extractors: Vec::new(),
            schema: DEFAULT_SCHEMA.to_string(),
            descriptive: false,
        }
    }

    /// A template whose entry had no `patterns` key.
    pub fn without_patterns(name: impl Into<String>) -> Self {
        Self {
            patterns: None,
            ..Self::new(name)
        }
    }

    pub fn with_patterns(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.patterns = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.get_or_insert_with(Vec::new).push(pattern.into());
        self
    }

    pub fn with_extractor(mut self, field: impl Into<String>, regex: impl Into<String>) -> Self {
        self.extractors.push(ExtractorSpec::new(field, regex));
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn descriptive(mut self, descriptive: bool) -> Self {
        self.descriptive = descriptive;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn patterns(&self) -> Option<&[String]> {
        self.patterns.as_deref()
    }

    pub fn extractors(&self) -> &[ExtractorSpec] {
        &self.extractors
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn is_descriptive(&self) -> bool {
        self.descriptive
    }

    /// Parse every pattern once so a scan can evaluate them per element.
    pub fn compile_patterns(&self, delimiter: AndDelimiter) -> Vec<PatternExpr> {
        self.patterns
            .iter()
            .flatten()
            .map(|p| PatternExpr::parse(p, delimiter))
            .collect()
    }
}

// ============================================================================
// Elements
// ============================================================================

/// Attributes of the `mxGeometry` child of a cell, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Geometry {
    pub attributes: Vec<(String, String)>,
}

impl Geometry {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|v| v.trim().parse().ok())
    }

    pub fn x(&self) -> Option<f64> {
        self.number("x")
    }

    pub fn y(&self) -> Option<f64> {
        self.number("y")
    }

    pub fn width(&self) -> Option<f64> {
        self.number("width")
    }

    pub fn height(&self) -> Option<f64> {
        self.number("height")
    }
}

impl Serialize for Geometry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_pairs(&self.attributes, serializer)
    }
}

/// A drawable cell considered for matching
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateElement {
    pub id: String,
    pub style: String,
    pub value: String,
    pub parent: String,
    /// Raw `vertex` attribute (usually "1" or empty)
    pub is_vertex: String,
    pub geometry: Option<Geometry>,
}

// ============================================================================
// Results
// ============================================================================

/// Field name to captures, in extractor order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    fields: Vec<(String, Vec<String>)>,
}

impl ExtractedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a field. A field that is already bound is replaced in place.
    pub fn insert(&mut self, field: impl Into<String>, values: Vec<String>) {
        let field = field.into();
        match self.fields.iter_mut().find(|(k, _)| *k == field) {
            Some((_, existing)) => *existing = values,
            None => self.fields.push((field, values)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_slice())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Every captured value across all fields
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().flat_map(|(_, v)| v.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for ExtractedFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_pairs(&self.fields, serializer)
    }
}

/// One element that satisfied one template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    pub id: String,
    pub value: String,
    pub style: String,
    pub parent: String,
    pub is_vertex: String,
    pub geometry: Option<Geometry>,
    pub matched_type: String,
    pub schema: String,
    pub extracted_fields: ExtractedFields,
}

impl MatchRecord {
    pub fn from_candidate(
        candidate: &CandidateElement,
        template: &Template,
        extracted_fields: ExtractedFields,
    ) -> Self {
        Self {
            id: candidate.id.clone(),
            value: candidate.value.clone(),
            style: candidate.style.clone(),
            parent: candidate.parent.clone(),
            is_vertex: candidate.is_vertex.clone(),
            geometry: candidate.geometry.clone(),
            matched_type: template.name().to_string(),
            schema: template.schema().to_string(),
            extracted_fields,
        }
    }
}

/// Template name to its matches, in template order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    entries: Vec<(String, Vec<MatchRecord>)>,
}

impl ScanResult {
    /// A result with an empty entry for every template.
    pub fn for_templates<'a>(templates: impl IntoIterator<Item = &'a Template>) -> Self {
        let mut result = Self::default();
        for template in templates {
            result.ensure(template.name());
        }
        result
    }

    fn ensure(&mut self, template: &str) -> &mut Vec<MatchRecord> {
        let idx = match self.entries.iter().position(|(k, _)| k == template) {
            Some(idx) => idx,
            None => {
                self.entries.push((template.to_string(), Vec::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    /// Replace the matches for one template, keeping its position.
    pub fn set(&mut self, template: &str, records: Vec<MatchRecord>) {
        *self.ensure(template) = records;
    }

    pub fn get(&self, template: &str) -> Option<&[MatchRecord]> {
        self.entries
            .iter()
            .find(|(k, _)| k == template)
            .map(|(_, v)| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[MatchRecord])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn template_count(&self) -> usize {
        self.entries.len()
    }

    pub fn total_matches(&self) -> usize {
        self.entries.iter().map(|(_, v)| v.len()).sum()
    }
}

impl Serialize for ScanResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_pairs(&self.entries, serializer)
    }
}
