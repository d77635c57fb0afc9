//! Contracts for external identity sources and the shared request context.
//!
//! Engine code only ever sees these traits; backend stores and directory
//! services plug in behind them as an ordered list of `Arc` handles.

pub mod errors;
pub mod filter;
pub mod memory;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::acl::types::Principal;

pub use errors::DirectoryError;
pub use filter::{Criterion, FilterCriteria, MatchOp};
pub use memory::{DirectoryFile, MemoryDirectory};

/// Per-request state shared by every source call: the time budget of a
/// single call, and the sources that already blew it.
///
/// A source that times out once is skipped for the rest of the request;
/// the other sources keep their full budget.
#[derive(Debug, Default)]
pub struct ResolveContext {
    call_timeout: Option<Duration>,
    timed_out: Mutex<HashSet<String>>,
}

impl ResolveContext {
    /// No time limit.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Limit every source call to `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            call_timeout: Some(timeout),
            timed_out: Mutex::new(HashSet::new()),
        }
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout
    }

    /// Whether `source` exceeded the budget earlier in this request.
    pub fn is_timed_out(&self, source: &str) -> bool {
        self.timed_out_sources().contains(source)
    }

    fn timed_out_sources(&self) -> MutexGuard<'_, HashSet<String>> {
        // The set stays consistent even if a holder panicked.
        self.timed_out.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one call against `source`.
    ///
    /// A source that already timed out in this request is not called again.
    /// A result that arrives after the budget is discarded and the source is
    /// marked as timed out. Both surface as `Timeout`.
    pub fn run<T>(
        &self,
        source: &str,
        call: impl FnOnce() -> Result<T, DirectoryError>,
    ) -> Result<T, DirectoryError> {
        let timeout = || DirectoryError::Timeout {
            source_name: source.to_string(),
        };
        if self.is_timed_out(source) {
            return Err(timeout());
        }

        let started = Instant::now();
        let value = call()?;
        if let Some(budget) = self.call_timeout {
            let elapsed = started.elapsed();
            if elapsed > budget {
                tracing::debug!(
                    source,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = budget.as_millis() as u64,
                    "source call exceeded its budget"
                );
                self.timed_out_sources().insert(source.to_string());
                return Err(timeout());
            }
        }
        Ok(value)
    }
}

/// Common identity of every source, used in logs.
pub trait DirectorySource: Send + Sync {
    fn name(&self) -> &str;
}

/// A user returned by [`DirectoryCatalogAdapter::find_users`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoundUser {
    pub name: String,
    pub attributes: HashMap<String, Vec<String>>,
}

/// Attribute and membership queries against one identity source.
pub trait DirectoryCatalogAdapter: DirectorySource {
    /// First value of a single attribute.
    fn get_attribute(
        &self,
        principal: &str,
        attribute: &str,
        ctx: &ResolveContext,
    ) -> Result<Option<String>, DirectoryError> {
        let mut attrs = self.get_attributes(principal, &[attribute.to_string()], ctx)?;
        Ok(attrs
            .remove(attribute)
            .and_then(|values| values.into_iter().next()))
    }

    /// Requested attributes that exist for the principal. Missing ones are omitted.
    fn get_attributes(
        &self,
        principal: &str,
        attributes: &[String],
        ctx: &ResolveContext,
    ) -> Result<HashMap<String, Vec<String>>, DirectoryError>;

    /// Users matching every criterion, each carrying the requested attributes.
    fn find_users(
        &self,
        criteria: &FilterCriteria,
        attributes: &[String],
        ctx: &ResolveContext,
    ) -> Result<Vec<FoundUser>, DirectoryError>;

    /// Names of the groups the user is a direct member of.
    fn get_user_groups(
        &self,
        user: &str,
        ctx: &ResolveContext,
    ) -> Result<BTreeSet<String>, DirectoryError>;

    fn is_group_member(
        &self,
        user: &str,
        group: &str,
        ctx: &ResolveContext,
    ) -> Result<bool, DirectoryError>;

    /// Names of the groups that list `group` as a direct member.
    fn get_parent_groups(
        &self,
        group: &str,
        ctx: &ResolveContext,
    ) -> Result<BTreeSet<String>, DirectoryError>;
}

/// Resolves one level of group membership.
pub trait GroupProvider: DirectorySource {
    /// Direct members (users and nested groups), or `None` if this provider
    /// does not know the group.
    fn resolve_group(
        &self,
        group: &str,
        ctx: &ResolveContext,
    ) -> Result<Option<Vec<Principal>>, DirectoryError>;
}

/// Role membership as stored by one source.
pub trait RoleSource: DirectorySource {
    fn roles_for_user(
        &self,
        user: &str,
        ctx: &ResolveContext,
    ) -> Result<BTreeSet<String>, DirectoryError>;

    fn roles_for_group(
        &self,
        group: &str,
        ctx: &ResolveContext,
    ) -> Result<BTreeSet<String>, DirectoryError>;

    fn role_members(
        &self,
        role: &str,
        ctx: &ResolveContext,
    ) -> Result<Vec<Principal>, DirectoryError>;

    /// Roles mapped to a community id.
    fn roles_for_community(
        &self,
        community: &str,
        ctx: &ResolveContext,
    ) -> Result<BTreeSet<String>, DirectoryError>;
}

/// Ordered, injected list of identity sources.
#[derive(Clone, Default)]
pub struct DirectorySources {
    pub catalogs: Vec<Arc<dyn DirectoryCatalogAdapter>>,
    pub group_providers: Vec<Arc<dyn GroupProvider>>,
    pub role_sources: Vec<Arc<dyn RoleSource>>,
}

impl DirectorySources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source implementing every contract in all three lists.
    pub fn with_directory<D>(self, directory: Arc<D>) -> Self
    where
        D: DirectoryCatalogAdapter + GroupProvider + RoleSource + 'static,
    {
        self.with_catalog(directory.clone())
            .with_group_provider(directory.clone())
            .with_role_source(directory)
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn DirectoryCatalogAdapter>) -> Self {
        self.catalogs.push(catalog);
        self
    }

    pub fn with_group_provider(mut self, provider: Arc<dyn GroupProvider>) -> Self {
        self.group_providers.push(provider);
        self
    }

    pub fn with_role_source(mut self, source: Arc<dyn RoleSource>) -> Self {
        self.role_sources.push(source);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty() && self.group_providers.is_empty() && self.role_sources.is_empty()
    }
}

impl fmt::Debug for DirectorySources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |list: Vec<&str>| list.join(", ");
        f.debug_struct("DirectorySources")
            .field(
                "catalogs",
                &names(self.catalogs.iter().map(|s| s.name()).collect()),
            )
            .field(
                "group_providers",
                &names(self.group_providers.iter().map(|s| s.name()).collect()),
            )
            .field(
                "role_sources",
                &names(self.role_sources.iter().map(|s| s.name()).collect()),
            )
            .finish()
    }
}
