//! Element scanner
//!
//! Walks a document, picks out candidate cells, and runs every template's
//! patterns and extractors over them.
//!
//! ## Flow
//!
//! ```text
//! document ──▶ candidates ──▶ per template:
//!                               patterns (any) ──▶ extractors ──▶ post-processors ──▶ MatchRecord
//! ```
//!
//! Candidates are collected once per document. Templates are read-only during a
//! scan and results come back in template order, each list in document order.

use crate::config::{ScanPolicy, SearchTextMode};
use crate::describe::{DescriptionDeriver, MatchPostProcessor};
use crate::document::{Document, DocumentNode};
use crate::error::Result;
use crate::extractor::FieldExtractor;
use crate::pattern::{self, PatternExpr};
use crate::types::{CandidateElement, Geometry, MatchRecord, ScanResult, Template};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Child element holding a cell's position and size
const GEOMETRY_TAG: &str = "mxGeometry";

/// A candidate cell together with the text its patterns are matched against
#[derive(Debug, Clone)]
pub struct Candidate {
    pub element: CandidateElement,
    /// Lower-cased
    pub search_text: String,
}

/// A template with its patterns and extractors compiled
#[derive(Debug)]
pub struct CompiledTemplate<'a> {
    template: &'a Template,
    /// `None` when the template has no `patterns` key
    patterns: Option<Vec<PatternExpr>>,
    extractor: FieldExtractor,
    descriptive: bool,
}

impl CompiledTemplate<'_> {
    pub fn template(&self) -> &Template {
        self.template
    }

    pub fn is_descriptive(&self) -> bool {
        self.descriptive
    }
}

/// Outcome of scanning one document in a batch
#[derive(Debug)]
pub struct DocumentOutcome {
    pub path: PathBuf,
    pub result: Result<ScanResult>,
}

/// Outcomes for every document in a batch, in input order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub documents: Vec<DocumentOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = (&Path, &ScanResult)> {
        self.documents
            .iter()
            .filter_map(|d| d.result.as_ref().ok().map(|r| (d.path.as_path(), r)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&Path, &crate::ScoutError)> {
        self.documents
            .iter()
            .filter_map(|d| d.result.as_ref().err().map(|e| (d.path.as_path(), e)))
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }
}

/// Matches templates against diagram documents
pub struct Scanner {
    policy: ScanPolicy,
    post_processors: Vec<Box<dyn MatchPostProcessor>>,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    /// Scanner with the default policy and the description post-processor.
    pub fn new() -> Self {
        Self::with_policy(ScanPolicy::default())
    }

    pub fn with_policy(policy: ScanPolicy) -> Self {
        Self {
            policy,
            post_processors: vec![Box::new(DescriptionDeriver)],
        }
    }

    /// Add a post-processor run on matches of descriptive templates.
    pub fn with_post_processor(mut self, processor: impl MatchPostProcessor + 'static) -> Self {
        self.post_processors.push(Box::new(processor));
        self
    }

    /// Drop all post-processors, including the built-in description deriver.
    pub fn without_post_processors(mut self) -> Self {
        self.post_processors.clear();
        self
    }

    pub fn policy(&self) -> &ScanPolicy {
        &self.policy
    }

    /// True if `node` is a cell this scanner considers for matching.
    pub fn is_candidate<N: DocumentNode>(&self, node: &N) -> bool {
        if node.tag() != self.policy.candidate_tag {
            return false;
        }
        if !self.policy.stencil_filter {
            return true;
        }
        let style = node.attribute("style").unwrap_or("");
        style
            .to_lowercase()
            .contains(&self.policy.stencil_marker.to_lowercase())
    }

    /// Candidate cells of a document, in document order.
    pub fn candidates<N: DocumentNode>(&self, root: &N) -> Vec<Candidate> {
        root.descendants()
            .filter(|node| self.is_candidate(*node))
            .map(|node| Candidate {
                search_text: self.search_text(node),
                element: candidate_element(node),
            })
            .collect()
    }

    /// Text patterns are evaluated against, lower-cased.
    pub fn search_text<N: DocumentNode>(&self, node: &N) -> String {
        let value = node.attribute("value").unwrap_or("");
        match self.policy.search_text {
            SearchTextMode::StyleValue => {
                let style = node.attribute("style").unwrap_or("");
                format!("{} {}", style, value).to_lowercase()
            }
            SearchTextMode::Attributes => {
                let mut parts: Vec<String> = node
                    .attributes()
                    .iter()
                    .map(|(name, v)| format!("{}=\"{}\"", name, v))
                    .collect();
                if !value.is_empty() {
                    parts.push(format!("value=\"{}\"", value));
                }
                parts.join(" ").to_lowercase()
            }
        }
    }

    /// Compile patterns and extractors once so they can be reused across
    /// documents. Invalid extractor regexes are reported here.
    pub fn compile<'a>(&self, templates: &'a [Template]) -> Vec<CompiledTemplate<'a>> {
        templates
            .iter()
            .map(|template| CompiledTemplate {
                template,
                patterns: template
                    .patterns()
                    .map(|_| template.compile_patterns(self.policy.and_delimiter)),
                extractor: FieldExtractor::new(template.extractors()),
                descriptive: template.is_descriptive() || self.policy.is_descriptive(template.name()),
            })
            .collect()
    }

    /// Scan a parsed document tree with the given templates.
    pub fn scan<N: DocumentNode>(&self, root: &N, templates: &[Template]) -> ScanResult {
        self.scan_compiled(root, &self.compile(templates))
    }

    /// Scan a parsed document tree with templates compiled by [`Scanner::compile`].
    pub fn scan_compiled<N: DocumentNode>(&self, root: &N, templates: &[CompiledTemplate<'_>]) -> ScanResult {
        let candidates = self.candidates(root);
        debug!(candidates = candidates.len(), templates = templates.len(), "Scanning document");

        let mut result = ScanResult::for_templates(templates.iter().map(|c| c.template));
        for compiled in templates {
            let records = self.match_template(compiled, &candidates);
            debug!(template = %compiled.template.name(), matches = records.len(), "Template scanned");
            result.set(compiled.template.name(), records);
        }
        result
    }

    /// Match one compiled template against prepared candidates.
    pub fn match_template(&self, compiled: &CompiledTemplate<'_>, candidates: &[Candidate]) -> Vec<MatchRecord> {
        let Some(patterns) = &compiled.patterns else {
            return Vec::new();
        };
        let template = compiled.template;

        candidates
            .iter()
            .filter(|c| pattern::any_matches(patterns, &c.search_text))
            .map(|c| {
                let mut fields = compiled.extractor.extract(&c.element.value);
                if compiled.descriptive {
                    for processor in &self.post_processors {
                        processor.process(template, &c.element, &mut fields);
                        debug!(
                            processor = processor.name(),
                            template = %template.name(),
                            id = %c.element.id,
                            "Post-processed match"
                        );
                    }
                }
                MatchRecord::from_candidate(&c.element, template, fields)
            })
            .collect()
    }

    /// Load and scan one document. Load failures come back as errors so callers
    /// can tell them apart from a document with no matches.
    pub fn scan_file(&self, path: &Path, templates: &[Template]) -> Result<ScanResult> {
        self.scan_path(path, &self.compile(templates))
    }

    /// Scan several documents. Templates are compiled once for the whole batch;
    /// a document that fails to load is recorded and the batch moves on.
    pub fn scan_batch(&self, paths: &[PathBuf], templates: &[Template]) -> BatchReport {
        let compiled = self.compile(templates);
        let mut report = BatchReport::default();
        for path in paths {
            let result = self.scan_path(path, &compiled);
            if let Err(e) = &result {
                warn!(path = %path.display(), error = %e, "Failed to scan document");
            }
            report.documents.push(DocumentOutcome {
                path: path.clone(),
                result,
            });
        }
        report
    }

    fn scan_path(&self, path: &Path, templates: &[CompiledTemplate<'_>]) -> Result<ScanResult> {
        let start = Instant::now();
        let document = Document::load(path)?;
        let result = self.scan_compiled(document.root(), templates);
        info!(
            path = %path.display(),
            matches = result.total_matches(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Scanned document"
        );
        Ok(result)
    }
}

fn candidate_element<N: DocumentNode>(node: &N) -> CandidateElement {
    let attr = |name: &str| node.attribute(name).unwrap_or("").to_string();
    CandidateElement {
        id: attr("id"),
        style: attr("style"),
        value: attr("value"),
        parent: attr("parent"),
        is_vertex: attr("vertex"),
        geometry: node.find_child(GEOMETRY_TAG).map(|g| Geometry {
            attributes: g.attributes().to_vec(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::XmlElement;
    use crate::pattern::AndDelimiter;
    use crate::types::ExtractedFields;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::{self, Layer, SubscriberExt};

    fn cell(id: &str, style: &str, value: &str) -> XmlElement {
        XmlElement::new("mxCell")
            .with_attr("id", id)
            .with_attr("value", value)
            .with_attr("style", style)
            .with_attr("vertex", "1")
            .with_attr("parent", "1")
    }

    fn diagram(cells: Vec<XmlElement>) -> XmlElement {
        let mut root = XmlElement::new("root");
        for c in cells {
            root = root.with_child(c);
        }
        XmlElement::new("mxGraphModel").with_child(root)
    }

    #[test]
    fn test_stencil_filter() {
        let doc = diagram(vec![
            cell("a", "shape=stencil(xyz);", "router"),
            cell("b", "rounded=1;", "router"),
            XmlElement::new("mxGeometry").with_attr("style", "shape=stencil(q)"),
        ]);

        let ids: Vec<String> = Scanner::new()
            .candidates(&doc)
            .into_iter()
            .map(|c| c.element.id)
            .collect();
        assert_eq!(ids, vec!["a"]);

        let all_cells = Scanner::with_policy(ScanPolicy {
            stencil_filter: false,
            ..ScanPolicy::default()
        });
        assert_eq!(all_cells.candidates(&doc).len(), 2);
    }

    #[test]
    fn test_stencil_marker_is_case_insensitive() {
        let doc = diagram(vec![cell("a", "Shape=Stencil(XYZ);", "x")]);
        assert_eq!(Scanner::new().candidates(&doc).len(), 1);
    }

    #[test]
    fn test_search_text_modes() {
        let node = cell("7", "Shape=Stencil(a)", "Core<br>10.0.0.1");
        let style_value = Scanner::new().search_text(&node);
        assert_eq!(style_value, "shape=stencil(a) core<br>10.0.0.1");

        let attributes = Scanner::with_policy(ScanPolicy {
            search_text: SearchTextMode::Attributes,
            ..ScanPolicy::default()
        })
        .search_text(&node);
        assert_eq!(
            attributes,
            r#"id="7" value="core<br>10.0.0.1" style="shape=stencil(a)" vertex="1" parent="1" value="core<br>10.0.0.1""#
        );
    }

    #[test]
    fn test_one_record_per_template_even_if_many_patterns_match() {
        let doc = diagram(vec![cell("a", "shape=stencil(x)", "router core")]);
        let template = Template::new("Router").with_patterns(["router", "core", "shape=stencil("]);
        let result = Scanner::new().scan(&doc, &[template]);
        assert_eq!(result.get("Router").unwrap().len(), 1);
    }

    #[test]
    fn test_element_can_match_several_templates() {
        let doc = diagram(vec![cell("a", "shape=stencil(x)", "router core")]);
        let templates = vec![
            Template::new("Router").with_pattern("router"),
            Template::new("Core").with_pattern("core"),
            Template::new("Switch").with_pattern("switch"),
        ];
        let result = Scanner::new().scan(&doc, &templates);
        assert_eq!(result.get("Router").unwrap().len(), 1);
        assert_eq!(result.get("Core").unwrap().len(), 1);
        assert_eq!(result.get("Switch").unwrap().len(), 0);
    }

    #[test]
    fn test_template_without_patterns_never_matches() {
        let doc = diagram(vec![cell("a", "shape=stencil(x)", "anything")]);
        let result = Scanner::new().scan(&doc, &[Template::without_patterns("Broken")]);
        assert_eq!(result.get("Broken"), Some(&[][..]));
    }

    #[test]
    fn test_record_carries_metadata_and_geometry() {
        let node = cell("42", "shape=stencil(x)", "srv-1").with_child(
            XmlElement::new("mxGeometry")
                .with_attr("x", "10")
                .with_attr("y", "20")
                .with_attr("as", "geometry"),
        );
        let doc = diagram(vec![node]);
        let template = Template::new("Server")
            .with_pattern("srv")
            .with_schema("inventory")
            .with_extractor("host", r"srv-\d+");

        let result = Scanner::new().scan(&doc, &[template]);
        let record = &result.get("Server").unwrap()[0];
        assert_eq!(record.id, "42");
        assert_eq!(record.parent, "1");
        assert_eq!(record.is_vertex, "1");
        assert_eq!(record.matched_type, "Server");
        assert_eq!(record.schema, "inventory");
        assert_eq!(record.geometry.as_ref().unwrap().x(), Some(10.0));
        assert_eq!(record.extracted_fields.get("host"), Some(&["srv-1".to_string()][..]));
    }

    #[test]
    fn test_delimiter_follows_policy() {
        let doc = diagram(vec![cell("a", "shape=stencil(x)", "cisco router")]);
        let template = Template::new("Cisco").with_pattern("cisco:router");

        let semicolon = Scanner::new().scan(&doc, &[template.clone()]);
        assert_eq!(semicolon.get("Cisco").unwrap().len(), 0);

        let colon = Scanner::with_policy(ScanPolicy {
            and_delimiter: AndDelimiter::Colon,
            ..ScanPolicy::default()
        })
        .scan(&doc, &[template]);
        assert_eq!(colon.get("Cisco").unwrap().len(), 1);
    }

    #[test]
    fn test_descriptive_post_processing() {
        let doc = diagram(vec![cell("n", "shape=stencil(net)", "10.1.0.0/24<br>Office")]);
        let network = Template::new("Network")
            .with_pattern("shape=stencil(")
            .with_extractor("ip", r"\d+\.\d+\.\d+\.\d+/\d+");
        let segment = Template::new("Segment")
            .with_pattern("shape=stencil(")
            .with_extractor("ip", r"\d+\.\d+\.\d+\.\d+/\d+");

        let result = Scanner::new().scan(&doc, &[network.clone(), segment]);
        let fields = &result.get("Network").unwrap()[0].extracted_fields;
        assert_eq!(fields.get("description"), Some(&["Office".to_string()][..]));
        assert!(!result.get("Segment").unwrap()[0].extracted_fields.contains("description"));

        let plain = Scanner::new().without_post_processors().scan(&doc, &[network]);
        assert!(!plain.get("Network").unwrap()[0].extracted_fields.contains("description"));
    }

    /// Tags every match it sees and remembers the element ids.
    struct Tagger {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl MatchPostProcessor for Tagger {
        fn name(&self) -> &str {
            "tagger"
        }

        fn process(&self, template: &Template, candidate: &CandidateElement, fields: &mut ExtractedFields) {
            self.seen.lock().unwrap().push(candidate.id.clone());
            fields.insert("tagged_by", vec![format!("{}:{}", self.name(), template.name())]);
        }
    }

    #[test]
    fn test_custom_post_processor_runs_for_descriptive_templates_only() {
        let doc = diagram(vec![
            cell("r1", "shape=stencil(x)", "router"),
            cell("s1", "shape=stencil(x)", "switch"),
        ]);
        let templates = vec![
            Template::new("Router").with_pattern("router").descriptive(true),
            Template::new("Switch").with_pattern("switch"),
        ];
        let seen = Arc::new(Mutex::new(Vec::new()));
        let scanner = Scanner::new()
            .without_post_processors()
            .with_post_processor(Tagger { seen: Arc::clone(&seen) });

        let result = scanner.scan(&doc, &templates);

        let router = &result.get("Router").unwrap()[0].extracted_fields;
        assert_eq!(router.get("tagged_by"), Some(&["tagger:Router".to_string()][..]));
        assert!(!result.get("Switch").unwrap()[0].extracted_fields.contains("tagged_by"));
        assert_eq!(*seen.lock().unwrap(), vec!["r1".to_string()]);
    }

    #[test]
    fn test_policy_descriptive_list_enables_post_processors() {
        let doc = diagram(vec![cell("s1", "shape=stencil(x)", "switch")]);
        let templates = vec![Template::new("Switch").with_pattern("switch")];
        let seen = Arc::new(Mutex::new(Vec::new()));
        let scanner = Scanner::with_policy(ScanPolicy {
            descriptive_templates: vec!["Switch".to_string()],
            ..ScanPolicy::default()
        })
        .with_post_processor(Tagger { seen: Arc::clone(&seen) });

        let compiled = scanner.compile(&templates);
        assert!(compiled[0].is_descriptive());

        scanner.scan_compiled(&doc, &compiled);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    /// Counts WARN events.
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: layer::Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_batch_warns_about_invalid_regex_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths: Vec<PathBuf> = (0..3)
            .map(|i| {
                let path = dir.path().join(format!("doc{}.drawio", i));
                std::fs::write(
                    &path,
                    r#"<mxfile><mxCell id="1" style="shape=stencil(x)" value="srv-1"/></mxfile>"#,
                )
                .unwrap();
                path
            })
            .collect();
        let templates = vec![Template::new("Server")
            .with_pattern("srv")
            .with_extractor("broken", "(unclosed")
            .with_extractor("host", r"srv-\d+")];

        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(Arc::clone(&warnings)));
        let report = tracing::subscriber::with_default(subscriber, || {
            Scanner::new().scan_batch(&paths, &templates)
        });

        assert_eq!(report.failure_count(), 0);
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
        for (_, result) in report.succeeded() {
            let fields = &result.get("Server").unwrap()[0].extracted_fields;
            assert!(!fields.contains("broken"));
            assert_eq!(fields.get("host"), Some(&["srv-1".to_string()][..]));
        }
    }

    #[test]
    fn test_scan_batch_continues_after_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let good = dir.path().join("good.drawio");
        std::fs::write(
            &good,
            r#"<mxfile><mxCell id="1" style="shape=stencil(x)" value="srv"/></mxfile>"#,
        )
        .unwrap();
        let broken = dir.path().join("broken.drawio");
        std::fs::write(&broken, "<mxfile><mxCell>").unwrap();
        let missing = dir.path().join("missing.drawio");

        let templates = vec![Template::new("Server").with_pattern("srv")];
        let report = Scanner::new().scan_batch(&[broken, good.clone(), missing], &templates);

        assert_eq!(report.documents.len(), 3);
        assert_eq!(report.failure_count(), 2);
        let ok: Vec<_> = report.succeeded().collect();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].0, good.as_path());
        assert_eq!(ok[0].1.get("Server").unwrap().len(), 1);
    }
}
