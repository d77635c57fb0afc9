use miette::Diagnostic;
use thiserror::Error;

use crate::acl::errors::{AccessError, AclError};
use crate::directory::DirectoryError;

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    #[diagnostic(code(aclengine::io))]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    #[diagnostic(code(aclengine::config))]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(aclengine::serde))]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Acl(#[from] AclError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Directory(#[from] DirectoryError),

    #[error("No ACL defined for resource `{0}`")]
    #[diagnostic(
        code(aclengine::unknown_resource),
        help("Define it with: acl \"<resource>\" {{ user \"name\" level=1 }}")
    )]
    UnknownResource(String),

    #[error("Invalid arguments: {0}")]
    #[diagnostic(code(aclengine::usage), help("Run with --help for usage"))]
    Usage(String),
}
