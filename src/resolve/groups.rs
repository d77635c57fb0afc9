use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;

use crate::acl::types::{Principal, PrincipalKind};
use crate::directory::{
    DirectoryCatalogAdapter, DirectorySources, GroupProvider, ResolveContext, RoleSource,
};
use crate::resolve::gather;

/// Nesting levels followed before a group is kept unexpanded.
pub const DEFAULT_MAX_GROUP_DEPTH: usize = 10;

/// Flattens nested group membership and scopes principals to communities.
pub struct GroupExpansionService {
    catalogs: Vec<Arc<dyn DirectoryCatalogAdapter>>,
    providers: Vec<Arc<dyn GroupProvider>>,
    role_sources: Vec<Arc<dyn RoleSource>>,
    max_depth: usize,
}

impl GroupExpansionService {
    pub fn new(sources: &DirectorySources) -> Self {
        Self {
            catalogs: sources.catalogs.clone(),
            providers: sources.group_providers.clone(),
            role_sources: sources.role_sources.clone(),
            max_depth: DEFAULT_MAX_GROUP_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Union of the direct members every provider reports for `group`.
    /// `None` when no provider could resolve it.
    fn resolve_group(&self, group: &str, ctx: &ResolveContext) -> Option<Vec<Principal>> {
        let answers = gather(&self.providers, ctx, "resolve_group", |p| {
            p.resolve_group(group, ctx)
        });
        let mut known = false;
        let mut members = Vec::new();
        for answer in answers.into_iter().flatten() {
            known = true;
            for member in answer {
                if !members.contains(&member) {
                    members.push(member);
                }
            }
        }
        known.then_some(members)
    }

    /// Replace every group in `principals` by its transitive members.
    ///
    /// Users and roles pass through. A group no provider can resolve, or one
    /// sitting deeper than `max_depth`, stays in the result as an opaque
    /// `Group` principal. Cycles are cut by a visited set.
    pub fn expand_groups(&self, principals: &[Principal], ctx: &ResolveContext) -> Vec<Principal> {
        let mut result: Vec<Principal> = Vec::new();
        let mut seen: HashSet<Principal> = HashSet::new();
        let mut visited: HashSet<Principal> = HashSet::new();
        let mut queue: VecDeque<(Principal, usize)> = VecDeque::new();

        let mut emit = |p: Principal, result: &mut Vec<Principal>| {
            if seen.insert(p.clone()) {
                result.push(p);
            }
        };

        for p in principals {
            match p.kind {
                PrincipalKind::Group => queue.push_back((p.clone(), 0)),
                _ => emit(p.clone(), &mut result),
            }
        }

        while let Some((group, depth)) = queue.pop_front() {
            if !visited.insert(group.clone()) {
                continue;
            }
            if depth >= self.max_depth {
                tracing::warn!(
                    group = %group.name,
                    max_depth = self.max_depth,
                    "group nesting too deep, keeping group unexpanded"
                );
                emit(group, &mut result);
                continue;
            }
            match self.resolve_group(&group.name, ctx) {
                None => {
                    tracing::debug!(group = %group.name, "group not resolvable, kept opaque");
                    emit(group, &mut result);
                }
                Some(members) => {
                    for member in members {
                        match member.kind {
                            PrincipalKind::Group => queue.push_back((member, depth + 1)),
                            _ => emit(member, &mut result),
                        }
                    }
                }
            }
        }

        result
    }

    /// Union of the user's direct groups across every catalog.
    pub fn groups_for_user(&self, user: &str, ctx: &ResolveContext) -> BTreeSet<String> {
        gather(&self.catalogs, ctx, "get_user_groups", |c| {
            c.get_user_groups(user, ctx)
        })
        .into_iter()
        .flatten()
        .collect()
    }

    /// Every group the user belongs to, directly or through nested groups.
    ///
    /// Walks up from the direct groups. Cycles are cut by a visited set; a
    /// group at `max_depth` is kept but its own parents are not followed.
    pub fn all_groups_for_user(&self, user: &str, ctx: &ResolveContext) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        let mut visited: HashSet<Principal> = HashSet::new();
        let mut queue: VecDeque<(String, usize)> = self
            .groups_for_user(user, ctx)
            .into_iter()
            .map(|group| (group, 0))
            .collect();

        while let Some((group, depth)) = queue.pop_front() {
            if !visited.insert(Principal::group(group.as_str())) {
                continue;
            }
            if depth >= self.max_depth {
                tracing::warn!(
                    %group,
                    user,
                    max_depth = self.max_depth,
                    "group nesting too deep, not following parents"
                );
            } else {
                for parent in self.parent_groups(&group, ctx) {
                    queue.push_back((parent, depth + 1));
                }
            }
            found.insert(group);
        }

        found
    }

    /// Union of the groups directly containing `group` across every catalog.
    fn parent_groups(&self, group: &str, ctx: &ResolveContext) -> BTreeSet<String> {
        gather(&self.catalogs, ctx, "get_parent_groups", |c| {
            c.get_parent_groups(group, ctx)
        })
        .into_iter()
        .flatten()
        .collect()
    }

    /// Keep the principals that belong to `community`.
    ///
    /// The member set is every role mapped to the community, plus those roles'
    /// members. With `expand_groups`, group members of those roles are
    /// flattened first so that users reached through groups count as well.
    /// Input order is preserved.
    pub fn filter_by_community(
        &self,
        principals: &[Principal],
        community: &str,
        expand_groups: bool,
        ctx: &ResolveContext,
    ) -> Vec<Principal> {
        let roles: BTreeSet<String> = gather(&self.role_sources, ctx, "roles_for_community", |s| {
            s.roles_for_community(community, ctx)
        })
        .into_iter()
        .flatten()
        .collect();

        let mut members: Vec<Principal> = roles.iter().map(Principal::role).collect();
        for role in &roles {
            members.extend(
                gather(&self.role_sources, ctx, "role_members", |s| {
                    s.role_members(role, ctx)
                })
                .into_iter()
                .flatten(),
            );
        }

        if expand_groups {
            let expanded = self.expand_groups(&members, ctx);
            members.extend(expanded);
        }

        let member_set: HashSet<Principal> = members.into_iter().collect();
        tracing::debug!(
            community,
            roles = roles.len(),
            members = member_set.len(),
            "computed community member set"
        );

        principals
            .iter()
            .filter(|p| member_set.contains(p))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;

    fn service(dir: MemoryDirectory) -> GroupExpansionService {
        GroupExpansionService::new(&DirectorySources::new().with_directory(Arc::new(dir)))
    }

    fn names(principals: &[Principal]) -> Vec<String> {
        principals.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_expand_nested_groups() {
        let svc = service(
            MemoryDirectory::new("dir")
                .with_group("all", vec![Principal::user("ann"), Principal::group("eng")])
                .with_group("eng", vec![Principal::user("bob"), Principal::group("ops")])
                .with_group("ops", vec![Principal::user("cid")]),
        );
        let out = svc.expand_groups(
            &[Principal::group("all"), Principal::role("keep")],
            &ResolveContext::unbounded(),
        );
        assert_eq!(names(&out), vec!["role/keep", "user/ann", "user/bob", "user/cid"]);
    }

    #[test]
    fn test_unresolvable_group_kept_opaque() {
        let svc = service(
            MemoryDirectory::new("dir").with_group("eng", vec![Principal::group("external")]),
        );
        let out = svc.expand_groups(&[Principal::group("eng")], &ResolveContext::unbounded());
        assert_eq!(out, vec![Principal::group("external")]);
    }

    #[test]
    fn test_cycle_terminates() {
        let svc = service(
            MemoryDirectory::new("dir")
                .with_group("a", vec![Principal::user("ann"), Principal::group("b")])
                .with_group("b", vec![Principal::user("bob"), Principal::group("A")]),
        );
        let out = svc.expand_groups(&[Principal::group("a")], &ResolveContext::unbounded());
        assert_eq!(names(&out), vec!["user/ann", "user/bob"]);
    }

    #[test]
    fn test_depth_limit_keeps_deep_group() {
        let mut dir = MemoryDirectory::new("dir");
        for i in 0..5 {
            dir = dir.with_group(&format!("g{i}"), vec![Principal::group(format!("g{}", i + 1))]);
        }
        dir = dir.with_group("g5", vec![Principal::user("deep")]);

        let svc = service(dir).with_max_depth(3);
        let out = svc.expand_groups(&[Principal::group("g0")], &ResolveContext::unbounded());
        assert_eq!(out, vec![Principal::group("g3")]);

        let svc_deep = svc.with_max_depth(DEFAULT_MAX_GROUP_DEPTH);
        let out = svc_deep.expand_groups(&[Principal::group("g0")], &ResolveContext::unbounded());
        assert_eq!(out, vec![Principal::user("deep")]);
    }

    #[test]
    fn test_members_merged_across_providers() {
        let a = Arc::new(MemoryDirectory::new("a").with_group("eng", vec![Principal::user("ann")]));
        let b = Arc::new(
            MemoryDirectory::new("b")
                .with_group("ENG", vec![Principal::user("bob"), Principal::user("ANN")]),
        );
        let svc = GroupExpansionService::new(
            &DirectorySources::new()
                .with_directory(a)
                .with_directory(b),
        );
        let out = svc.expand_groups(&[Principal::group("eng")], &ResolveContext::unbounded());
        assert_eq!(names(&out), vec!["user/ann", "user/bob"]);

        let groups = svc.groups_for_user("ann", &ResolveContext::unbounded());
        assert_eq!(groups, BTreeSet::from(["ENG".to_string(), "eng".to_string()]));
    }

    #[test]
    fn test_all_groups_for_user_follows_parents() {
        let svc = service(
            MemoryDirectory::new("dir")
                .with_group("all", vec![Principal::group("staff")])
                .with_group("staff", vec![Principal::group("editors"), Principal::user("bob")])
                .with_group("editors", vec![Principal::user("alice")])
                .with_group("other", vec![Principal::user("carol")]),
        );
        let ctx = ResolveContext::unbounded();

        assert_eq!(
            svc.groups_for_user("alice", &ctx),
            BTreeSet::from(["editors".to_string()])
        );
        assert_eq!(
            svc.all_groups_for_user("alice", &ctx),
            BTreeSet::from(["all".to_string(), "editors".to_string(), "staff".to_string()])
        );
        assert_eq!(
            svc.all_groups_for_user("bob", &ctx),
            BTreeSet::from(["all".to_string(), "staff".to_string()])
        );
        assert!(svc.all_groups_for_user("nobody", &ctx).is_empty());
    }

    #[test]
    fn test_all_groups_for_user_cycle_and_depth() {
        let cyclic = service(
            MemoryDirectory::new("dir")
                .with_group("a", vec![Principal::user("ann"), Principal::group("b")])
                .with_group("b", vec![Principal::group("A")]),
        );
        assert_eq!(
            cyclic.all_groups_for_user("ann", &ResolveContext::unbounded()),
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );

        let mut dir = MemoryDirectory::new("dir").with_group("g0", vec![Principal::user("deep")]);
        for i in 1..6 {
            dir = dir.with_group(&format!("g{i}"), vec![Principal::group(format!("g{}", i - 1))]);
        }
        let shallow = service(dir).with_max_depth(2);
        assert_eq!(
            shallow.all_groups_for_user("deep", &ResolveContext::unbounded()),
            BTreeSet::from(["g0".to_string(), "g1".to_string(), "g2".to_string()])
        );
    }

    #[test]
    fn test_filter_by_community() {
        let svc = service(
            MemoryDirectory::new("dir")
                .with_group("eng", vec![Principal::user("bob")])
                .with_role(
                    "c1-authors",
                    vec![Principal::user("ann"), Principal::group("eng")],
                    Some("c1"),
                )
                .with_role("c2-authors", vec![Principal::user("cid")], Some("c2")),
        );
        let input = vec![
            Principal::user("cid"),
            Principal::user("bob"),
            Principal::user("ann"),
            Principal::group("eng"),
            Principal::role("c1-authors"),
            Principal::role("c2-authors"),
        ];
        let ctx = ResolveContext::unbounded();

        let flat = svc.filter_by_community(&input, "c1", false, &ctx);
        assert_eq!(names(&flat), vec!["user/ann", "group/eng", "role/c1-authors"]);

        let expanded = svc.filter_by_community(&input, "c1", true, &ctx);
        assert_eq!(
            names(&expanded),
            vec!["user/bob", "user/ann", "group/eng", "role/c1-authors"]
        );

        assert!(svc.filter_by_community(&input, "unknown", true, &ctx).is_empty());
    }
}
