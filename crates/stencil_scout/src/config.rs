//! Scan policy configuration
//!
//! Controls which cells count as candidates, what text patterns are matched
//! against, and which templates get a derived description. Loaded from TOML:
//!
//! ```toml
//! stencil_filter = true
//! search_text = "style_value"
//! and_delimiter = ";"
//! descriptive_templates = ["Network"]
//! ```

use crate::pattern::AndDelimiter;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name
pub const DEFAULT_CONFIG_FILE: &str = "stencil.toml";

/// How the text handed to pattern evaluation is built from a cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTextMode {
    /// `style` and `value`, separated by a space
    #[default]
    StyleValue,
    /// Every attribute as `name="value"`, plus `value` repeated at the end
    Attributes,
}

impl SearchTextMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchTextMode::StyleValue => "style_value",
            SearchTextMode::Attributes => "attributes",
        }
    }
}

/// Main configuration for a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPolicy {
    /// Only consider cells whose style carries the stencil marker
    #[serde(default = "default_stencil_filter")]
    pub stencil_filter: bool,

    #[serde(default)]
    pub search_text: SearchTextMode,

    /// Separator between AND-terms in patterns
    #[serde(default)]
    pub and_delimiter: AndDelimiter,

    /// Templates that get a derived `description` field
    #[serde(default = "default_descriptive_templates")]
    pub descriptive_templates: Vec<String>,

    /// Tag of drawable cells
    #[serde(default = "default_candidate_tag")]
    pub candidate_tag: String,

    /// Style substring marking stencil-backed shapes (compared case-insensitively)
    #[serde(default = "default_stencil_marker")]
    pub stencil_marker: String,
}

fn default_stencil_filter() -> bool {
    true
}

fn default_descriptive_templates() -> Vec<String> {
    vec!["Network".to_string()]
}

fn default_candidate_tag() -> String {
    "mxCell".to_string()
}

fn default_stencil_marker() -> String {
    "shape=stencil(".to_string()
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            stencil_filter: default_stencil_filter(),
            search_text: SearchTextMode::default(),
            and_delimiter: AndDelimiter::default(),
            descriptive_templates: default_descriptive_templates(),
            candidate_tag: default_candidate_tag(),
            stencil_marker: default_stencil_marker(),
        }
    }
}

impl ScanPolicy {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ScanPolicy =
            toml::from_str(&content).map_err(|e| crate::ScoutError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::ScoutError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn is_descriptive(&self, template: &str) -> bool {
        self.descriptive_templates.iter().any(|t| t == template)
    }
}
