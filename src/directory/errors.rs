use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum DirectoryError {
    #[error("Directory source `{source_name}` unavailable: {reason}")]
    #[diagnostic(
        code(aclengine::directory::unavailable),
        help("The source is skipped; remaining sources still answer")
    )]
    Unavailable { source_name: String, reason: String },

    #[error("Directory source `{source_name}` timed out")]
    #[diagnostic(
        code(aclengine::directory::timeout),
        help("Raise `directory.timeout_ms` or check the source's health")
    )]
    Timeout { source_name: String },

    #[error("Invalid filter: {0}")]
    #[diagnostic(
        code(aclengine::directory::invalid_filter),
        help("Filter syntax: attribute=value for equality, attribute~pattern for LIKE (`%` any run, `_` one char, `\\` escapes)")
    )]
    InvalidFilter(String),

    #[error("Failed to load directory file `{path}`: {reason}")]
    #[diagnostic(
        code(aclengine::directory::load),
        help("Expected JSON with `users`, `groups` and `roles` arrays")
    )]
    Load { path: String, reason: String },
}

impl DirectoryError {
    pub fn unavailable(source_name: &str, reason: impl Into<String>) -> Self {
        DirectoryError::Unavailable {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }
}
