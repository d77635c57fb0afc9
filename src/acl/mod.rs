//! ACL indexing and access decisions.

pub mod engine;
pub mod errors;
pub mod index;
pub mod loader;
pub mod policy;
pub mod types;

pub use engine::{decide, get_access_level, has_access, AccessDecision, DecisionSource};
pub use errors::{AccessError, AclError};
pub use index::AclIndex;
pub use loader::{compile_acls, load_acls, AclRegistry};
pub use types::{
    AccessLevel, Acl, AclEntry, CombinationPolicy, Principal, PrincipalKind, PrincipalSet,
};
