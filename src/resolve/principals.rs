use std::sync::Arc;

use crate::acl::types::{Principal, PrincipalSet};
use crate::directory::{DirectorySources, ResolveContext};
use crate::resolve::groups::GroupExpansionService;
use crate::resolve::roles::RoleResolver;

/// Builds the [`PrincipalSet`] of an authenticated session.
///
/// Constructed once from the configured sources and shared by reference;
/// there is no process-wide instance.
pub struct PrincipalResolver {
    groups: Arc<GroupExpansionService>,
    roles: Arc<RoleResolver>,
    community: Option<String>,
}

impl PrincipalResolver {
    pub fn new(groups: Arc<GroupExpansionService>, roles: Arc<RoleResolver>) -> Self {
        Self {
            groups,
            roles,
            community: None,
        }
    }

    /// Wire both services over the same sources.
    pub fn from_sources(sources: &DirectorySources, max_group_depth: usize) -> Self {
        let groups = Arc::new(GroupExpansionService::new(sources).with_max_depth(max_group_depth));
        let roles = Arc::new(RoleResolver::new(sources, groups.clone()));
        Self::new(groups, roles)
    }

    /// Restrict resolved groups and roles to one community.
    pub fn with_community(mut self, community: impl Into<String>) -> Self {
        self.community = Some(community.into());
        self
    }

    pub fn community(&self) -> Option<&str> {
        self.community.as_deref()
    }

    pub fn groups(&self) -> &Arc<GroupExpansionService> {
        &self.groups
    }

    pub fn roles(&self) -> &Arc<RoleResolver> {
        &self.roles
    }

    /// Users as given, then the union of their groups (nested ones included),
    /// then the union of their roles.
    pub fn resolve<S: AsRef<str>>(&self, users: &[S], ctx: &ResolveContext) -> PrincipalSet {
        let mut set = PrincipalSet::new();
        let mut memberships: Vec<Principal> = Vec::new();

        for user in users {
            set.insert(Principal::user(user.as_ref()));
        }

        for user in users {
            let user = user.as_ref();
            memberships.extend(
                self.groups
                    .all_groups_for_user(user, ctx)
                    .into_iter()
                    .map(Principal::group),
            );
        }
        for user in users {
            memberships.extend(
                self.roles
                    .roles_for(&Principal::user(user.as_ref()), ctx)
                    .into_iter()
                    .map(Principal::role),
            );
        }

        if let Some(community) = &self.community {
            memberships = self
                .groups
                .filter_by_community(&memberships, community, true, ctx);
        }

        for p in memberships {
            set.insert(p);
        }

        tracing::debug!(
            users = set.users().len(),
            groups = set.groups().len(),
            roles = set.roles().len(),
            community = self.community.as_deref(),
            "resolved principal set"
        );

        set
    }
}
