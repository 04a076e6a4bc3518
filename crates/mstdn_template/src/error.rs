//! Error types for the template module.

use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur while assembling or serializing a template.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Section already closed: {0}")]
    SectionClosed(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
