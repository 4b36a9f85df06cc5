//! User-facing CLI errors
//!
//! Each error says what went wrong, optionally why, and what to try next.

use std::fmt;
use std::path::Path;
use stencil_scout::ScoutError;

#[derive(Debug)]
pub struct HelpfulError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(mut self, suggestions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    pub fn path_not_found(path: &Path) -> Self {
        Self::new(format!("Path not found: {}", path.display()))
            .with_context("The specified path does not exist on the filesystem")
            .with_suggestions([
                format!("TRY: Check that the path exists: ls -la {}", path.display()),
                "TRY: Check for typos in the path".to_string(),
            ])
    }

    pub fn not_a_directory(path: &Path) -> Self {
        Self::new(format!("Not a directory: {}", path.display()))
            .with_context("The list command expects a directory")
            .with_suggestion(format!("TRY: Scan the file directly: stencil scan {}", path.display()))
    }

    pub fn no_documents(dir: &Path) -> Self {
        Self::new(format!("No .drawio documents in {}", dir.display()))
            .with_suggestions([
                format!("TRY: Search subdirectories: stencil scan --recursive {}", dir.display()),
                format!("TRY: See what is there: stencil list --recursive {}", dir.display()),
            ])
    }

    pub fn template_file_not_found(path: &Path) -> Self {
        Self::new(format!("Template file not found: {}", path.display()))
            .with_context("Templates name the stencils to look for and the fields to extract")
            .with_suggestions([
                "TRY: Point at your template file: stencil scan --templates FILE PATH".to_string(),
                "TRY: Set STENCIL_TEMPLATES to the template file path".to_string(),
            ])
    }

    pub fn invalid_templates(path: &Path, details: &str) -> Self {
        Self::new(format!("Cannot load templates from {}", path.display()))
            .with_context(details.to_string())
            .with_suggestions([
                "TRY: The top level must map template names to their settings".to_string(),
                format!("TRY: Validate the file: stencil templates --templates {}", path.display()),
            ])
    }

    pub fn config_file_not_found(path: &Path) -> Self {
        Self::new(format!("Config file not found: {}", path.display()))
            .with_suggestion("TRY: Omit --config to use the default scan policy")
    }

    pub fn invalid_config(path: &Path, details: &str) -> Self {
        Self::new(format!("Invalid config file: {}", path.display()))
            .with_context(details.to_string())
            .with_suggestion("TRY: Print the defaults as a starting point: stencil config")
    }

    pub fn invalid_delimiter(delimiter: char) -> Self {
        Self::new(format!("Invalid AND delimiter: '{}'", delimiter))
            .with_context("Pattern terms are separated by ':' or ';'")
            .with_suggestion("TRY: --delimiter ';' or --delimiter ':'")
    }

    pub fn documents_failed(failed: usize, total: usize) -> Self {
        Self::new(format!("{} of {} document(s) could not be scanned", failed, total))
            .with_suggestions([
                "TRY: Check that each file is an uncompressed draw.io diagram".to_string(),
                "TRY: Re-run with -v for details".to_string(),
            ])
    }

    /// Map a template loading failure onto a user-facing error.
    pub fn from_template_error(path: &Path, err: ScoutError) -> Self {
        match err {
            ScoutError::TemplateFileNotFound(_) => Self::template_file_not_found(path),
            other => Self::invalid_templates(path, &other.to_string()),
        }
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}
