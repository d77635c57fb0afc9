use std::collections::BTreeSet;
use std::sync::Arc;

use crate::acl::types::{Principal, PrincipalKind};
use crate::directory::{DirectorySources, ResolveContext, RoleSource};
use crate::resolve::gather;
use crate::resolve::groups::GroupExpansionService;

/// Aggregates role membership over every configured role source.
///
/// Role names are exact tokens: `Admin` and `admin` are different roles here,
/// unlike ACL lookups.
pub struct RoleResolver {
    sources: Vec<Arc<dyn RoleSource>>,
    groups: Arc<GroupExpansionService>,
}

impl RoleResolver {
    pub fn new(sources: &DirectorySources, groups: Arc<GroupExpansionService>) -> Self {
        Self {
            sources: sources.role_sources.clone(),
            groups,
        }
    }

    /// Roles held by a user or group.
    ///
    /// For a user this includes the roles of every group it belongs to,
    /// nested groups included. Role principals have no roles of their own.
    pub fn roles_for(&self, principal: &Principal, ctx: &ResolveContext) -> BTreeSet<String> {
        match principal.kind {
            PrincipalKind::User => {
                let mut roles = self.direct_user_roles(&principal.name, ctx);
                for group in self.groups.all_groups_for_user(&principal.name, ctx) {
                    roles.extend(self.group_roles(&group, ctx));
                }
                roles
            }
            PrincipalKind::Group => self.group_roles(&principal.name, ctx),
            PrincipalKind::Role => BTreeSet::new(),
        }
    }

    fn direct_user_roles(&self, user: &str, ctx: &ResolveContext) -> BTreeSet<String> {
        gather(&self.sources, ctx, "roles_for_user", |s| s.roles_for_user(user, ctx))
            .into_iter()
            .flatten()
            .collect()
    }

    fn group_roles(&self, group: &str, ctx: &ResolveContext) -> BTreeSet<String> {
        gather(&self.sources, ctx, "roles_for_group", |s| {
            s.roles_for_group(group, ctx)
        })
        .into_iter()
        .flatten()
        .collect()
    }

    /// Members of `role` as reported by every source, first occurrence kept.
    pub fn role_members(&self, role: &str, ctx: &ResolveContext) -> Vec<Principal> {
        let mut members: Vec<Principal> = Vec::new();
        for member in gather(&self.sources, ctx, "role_members", |s| s.role_members(role, ctx))
            .into_iter()
            .flatten()
        {
            if !members.contains(&member) {
                members.push(member);
            }
        }
        members
    }

    pub fn roles_for_community(&self, community: &str, ctx: &ResolveContext) -> BTreeSet<String> {
        gather(&self.sources, ctx, "roles_for_community", |s| {
            s.roles_for_community(community, ctx)
        })
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn groups(&self) -> &GroupExpansionService {
        &self.groups
    }
}
