//! aclengine - Access Control Resolution Engine
//!
//! Resolves an authenticated session's users, groups and roles across the
//! configured identity sources and turns them into one effective access
//! level against an indexed ACL.

pub mod acl;
pub mod directory;
pub mod errors;
pub mod resolve;
pub mod settings;
