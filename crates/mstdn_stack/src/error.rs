//! Error types for stack building and deployment.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for stack operations.
pub type StackResult<T> = Result<T, StackError>;

/// Broad category of a [`StackError`], used to pick an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingDependency,
    ConfigurationIncomplete,
    Persistence,
    Provisioning,
    BuilderMisuse,
}

/// Errors that can occur while building or deploying stacks.
#[derive(Error, Debug)]
pub enum StackError {
    #[error("Missing dependency: resource registry has no `{key}` required by the {stack} stack (deploy the db stack first)")]
    MissingDependency { key: String, stack: String },

    #[error("Configuration incomplete: `{key}` {reason}")]
    ConfigurationIncomplete { key: String, reason: String },

    #[error("Failed to access {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt document {path:?}: {source}")]
    CorruptDocument {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Registry key `{key}` is owned by another stack and cannot be changed by {stack}")]
    RegistryConflict { key: String, stack: String },

    #[error("Provisioning failed for stack {stack}: {message}")]
    Provisioning { stack: String, message: String },

    #[error("Template error: {0}")]
    Template(#[from] mstdn_template::TemplateError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl StackError {
    pub fn missing_dependency(key: impl Into<String>, stack: impl Into<String>) -> Self {
        Self::MissingDependency {
            key: key.into(),
            stack: stack.into(),
        }
    }

    pub fn incomplete(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigurationIncomplete {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn registry_conflict(key: impl Into<String>, stack: impl Into<String>) -> Self {
        Self::RegistryConflict {
            key: key.into(),
            stack: stack.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StackError::MissingDependency { .. } => ErrorKind::MissingDependency,
            StackError::ConfigurationIncomplete { .. } => ErrorKind::ConfigurationIncomplete,
            StackError::Persistence { .. }
            | StackError::CorruptDocument { .. }
            | StackError::RegistryConflict { .. }
            | StackError::Yaml(_) => ErrorKind::Persistence,
            StackError::Provisioning { .. } => ErrorKind::Provisioning,
            StackError::Template(_) => ErrorKind::BuilderMisuse,
        }
    }
}
