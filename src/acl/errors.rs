use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum AclError {
    #[error("Failed to load ACL file `{path}`")]
    #[diagnostic(
        code(aclengine::acl::load),
        help("Check that the file exists and contains valid KDL syntax")
    )]
    PolicyLoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid ACL: {0}")]
    #[diagnostic(
        code(aclengine::acl::invalid_acl),
        help("An ACL needs a non-empty resource name and every entry needs a non-empty principal name")
    )]
    InvalidAcl(String),

    #[error("Invalid ACL entry: {0}")]
    #[diagnostic(
        code(aclengine::acl::invalid_entry),
        help("Entry syntax: user \"alice\" level=4 (also group/role); level must fit in an unsigned 32-bit integer")
    )]
    InvalidEntry(String),

    #[error("KDL parse error: {0}")]
    #[diagnostic(
        code(aclengine::acl::kdl_parse),
        help("Check the KDL syntax of the ACL file, see https://kdl.dev")
    )]
    KdlParse(String),

    #[error("I/O error: {0}")]
    #[diagnostic(code(aclengine::acl::io))]
    Io(#[from] std::io::Error),
}

/// A negative access decision. Always names the resource it was made for.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum AccessError {
    #[error("Authentication required to access `{resource}`")]
    #[diagnostic(
        code(aclengine::access::authentication_required),
        help("No user is authenticated and the ACL has no `Anonymous` user entry")
    )]
    AuthenticationRequired { resource: String },

    #[error("Access to `{resource}` denied")]
    #[diagnostic(
        code(aclengine::access::authorization_denied),
        help("None of the session's users, groups or roles match an ACL entry and there is no `Default` or `Anonymous` fallback")
    )]
    AuthorizationDenied { resource: String },
}

impl AccessError {
    pub fn resource(&self) -> &str {
        match self {
            AccessError::AuthenticationRequired { resource }
            | AccessError::AuthorizationDenied { resource } => resource,
        }
    }
}
