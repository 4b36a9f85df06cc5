//! Error types for stencil scanning

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Scout error type
#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Document not found: {0}")]
    DocumentNotFound(PathBuf),

    #[error("Document {path} is not valid UTF-8: {message}")]
    Encoding { path: PathBuf, message: String },

    #[error("Failed to parse document {path}: {message}")]
    DocumentParse { path: PathBuf, message: String },

    #[error("Template file not found: {0}")]
    TemplateFileNotFound(PathBuf),

    #[error("Failed to load templates: {0}")]
    TemplateLoad(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl ScoutError {
    /// True when the error means a document could not be scanned, as opposed to
    /// a problem with templates or configuration.
    pub fn is_document_failure(&self) -> bool {
        matches!(
            self,
            ScoutError::Io(_)
                | ScoutError::DocumentNotFound(_)
                | ScoutError::Encoding { .. }
                | ScoutError::DocumentParse { .. }
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ScoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_failure_classification() {
        let parse = ScoutError::DocumentParse {
            path: PathBuf::from("a.drawio"),
            message: "unexpected end".to_string(),
        };
        assert!(parse.is_document_failure());
        assert!(parse.to_string().contains("a.drawio"));

        let templates = ScoutError::TemplateLoad("bad yaml".to_string());
        assert!(!templates.is_document_failure());
    }
}
