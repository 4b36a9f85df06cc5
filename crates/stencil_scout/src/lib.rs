//! Stencil Scout - stencil matching and field extraction for diagrams
//!
//! Scans draw.io documents for shapes matching user-defined templates and pulls
//! inventory fields (hostnames, addresses, labels) out of each match.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌───────────────┐
//! │  Document   │     │   Scanner   │     │  Patterns   │     │  Extractors   │
//! │ (XML tree)  │────▶│ (candidate  │────▶│ (AND/OR/NOT │────▶│ (regex find-  │
//! │             │     │   cells)    │     │  substring) │     │  all → fields)│
//! └─────────────┘     └─────────────┘     └─────────────┘     └───────────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **Template**: named patterns + extractors + schema tag
//! - **Candidate**: an `mxCell` whose style marks it as a stencil shape
//! - **MatchRecord**: a candidate that satisfied a template, with extracted fields
//! - **ScanResult**: template name → matches, every template present

pub mod config;
pub mod describe;
pub mod document;
pub mod error;
pub mod extractor;
pub mod pattern;
pub mod report;
pub mod scanner;
pub mod templates;
pub mod types;

// Re-exports for convenience
pub use config::{ScanPolicy, SearchTextMode};
pub use describe::{DescriptionDeriver, MatchPostProcessor};
pub use document::{Document, DocumentNode, XmlElement};
pub use error::{Result, ScoutError};
pub use extractor::{extract, FieldExtractor};
pub use pattern::{evaluate, AndDelimiter, PatternExpr};
pub use scanner::{BatchReport, CompiledTemplate, DocumentOutcome, Scanner};
pub use templates::{TemplateDiagnostic, TemplateSet};
pub use types::{
    CandidateElement, ExtractedFields, ExtractorSpec, Geometry, MatchRecord, ScanResult, Template,
};
