//! Role and group resolution across every configured identity source.
//!
//! A failing source never fails a resolution: its error is logged and the
//! remaining sources still answer. When every source fails the result is
//! simply empty.

pub mod groups;
pub mod principals;
pub mod roles;

use std::sync::Arc;

use crate::directory::{
    DirectoryError, DirectorySource, DirectorySources, FilterCriteria, FoundUser, ResolveContext,
};

pub use groups::{GroupExpansionService, DEFAULT_MAX_GROUP_DEPTH};
pub use principals::PrincipalResolver;
pub use roles::RoleResolver;

/// Ask every source, keep the answers of those that responded in time.
pub(crate) fn gather<S, T, F>(
    sources: &[Arc<S>],
    ctx: &ResolveContext,
    operation: &str,
    call: F,
) -> Vec<T>
where
    S: DirectorySource + ?Sized,
    F: Fn(&S) -> Result<T, DirectoryError>,
{
    let mut answers = Vec::with_capacity(sources.len());
    let mut failures = 0usize;

    for source in sources {
        match ctx.run(source.name(), || call(source.as_ref())) {
            Ok(answer) => answers.push(answer),
            Err(err) => {
                failures += 1;
                tracing::warn!(
                    source = source.name(),
                    operation,
                    error = %err,
                    "directory source failed, skipping"
                );
            }
        }
    }

    if failures > 0 && answers.is_empty() {
        tracing::warn!(
            operation,
            sources = sources.len(),
            "every directory source failed, continuing with an empty result"
        );
    }

    answers
}

/// Search every catalog. A user reported by several catalogs is listed once,
/// as the first catalog reported it.
pub fn find_users(
    sources: &DirectorySources,
    criteria: &FilterCriteria,
    attributes: &[String],
    ctx: &ResolveContext,
) -> Vec<FoundUser> {
    let mut found: Vec<FoundUser> = Vec::new();
    for user in gather(&sources.catalogs, ctx, "find_users", |c| {
        c.find_users(criteria, attributes, ctx)
    })
    .into_iter()
    .flatten()
    {
        if !found
            .iter()
            .any(|f| f.name.to_lowercase() == user.name.to_lowercase())
        {
            found.push(user);
        }
    }
    found
}
