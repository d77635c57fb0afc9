use std::collections::{BTreeSet, HashMap};
use std::thread;
use std::time::Duration;

use aclengine::acl::Principal;
use aclengine::directory::{
    DirectoryCatalogAdapter, DirectoryError, DirectorySource, FilterCriteria, FoundUser,
    GroupProvider, MemoryDirectory, ResolveContext, RoleSource,
};

/// Source whose every call fails as unreachable
pub struct FailingDirectory {
    name: String,
}

impl FailingDirectory {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    fn fail<T>(&self) -> Result<T, DirectoryError> {
        Err(DirectoryError::unavailable(&self.name, "connection refused"))
    }
}

impl DirectorySource for FailingDirectory {
    fn name(&self) -> &str {
        &self.name
    }
}

impl DirectoryCatalogAdapter for FailingDirectory {
    fn get_attributes(
        &self,
        _principal: &str,
        _attributes: &[String],
        _ctx: &ResolveContext,
    ) -> Result<HashMap<String, Vec<String>>, DirectoryError> {
        self.fail()
    }

    fn find_users(
        &self,
        _criteria: &FilterCriteria,
        _attributes: &[String],
        _ctx: &ResolveContext,
    ) -> Result<Vec<FoundUser>, DirectoryError> {
        self.fail()
    }

    fn get_user_groups(
        &self,
        _user: &str,
        _ctx: &ResolveContext,
    ) -> Result<BTreeSet<String>, DirectoryError> {
        self.fail()
    }

    fn is_group_member(
        &self,
        _user: &str,
        _group: &str,
        _ctx: &ResolveContext,
    ) -> Result<bool, DirectoryError> {
        self.fail()
    }

    fn get_parent_groups(
        &self,
        _group: &str,
        _ctx: &ResolveContext,
    ) -> Result<BTreeSet<String>, DirectoryError> {
        self.fail()
    }
}

impl GroupProvider for FailingDirectory {
    fn resolve_group(
        &self,
        _group: &str,
        _ctx: &ResolveContext,
    ) -> Result<Option<Vec<Principal>>, DirectoryError> {
        self.fail()
    }
}

impl RoleSource for FailingDirectory {
    fn roles_for_user(
        &self,
        _user: &str,
        _ctx: &ResolveContext,
    ) -> Result<BTreeSet<String>, DirectoryError> {
        self.fail()
    }

    fn roles_for_group(
        &self,
        _group: &str,
        _ctx: &ResolveContext,
    ) -> Result<BTreeSet<String>, DirectoryError> {
        self.fail()
    }

    fn role_members(
        &self,
        _role: &str,
        _ctx: &ResolveContext,
    ) -> Result<Vec<Principal>, DirectoryError> {
        self.fail()
    }

    fn roles_for_community(
        &self,
        _community: &str,
        _ctx: &ResolveContext,
    ) -> Result<BTreeSet<String>, DirectoryError> {
        self.fail()
    }
}

/// Wraps a [`MemoryDirectory`] and sleeps before every answer.
pub struct SlowDirectory {
    inner: MemoryDirectory,
    delay: Duration,
}

impl SlowDirectory {
    pub fn new(inner: MemoryDirectory, delay: Duration) -> Self {
        Self { inner, delay }
    }

    fn call<T>(
        &self,
        _ctx: &ResolveContext,
        f: impl FnOnce() -> Result<T, DirectoryError>,
    ) -> Result<T, DirectoryError> {
        thread::sleep(self.delay);
        f()
    }
}

impl DirectorySource for SlowDirectory {
    fn name(&self) -> &str {
        self.inner.name()
    }
}

impl DirectoryCatalogAdapter for SlowDirectory {
    fn get_attributes(
        &self,
        principal: &str,
        attributes: &[String],
        ctx: &ResolveContext,
    ) -> Result<HashMap<String, Vec<String>>, DirectoryError> {
        self.call(ctx, || self.inner.get_attributes(principal, attributes, ctx))
    }

    fn find_users(
        &self,
        criteria: &FilterCriteria,
        attributes: &[String],
        ctx: &ResolveContext,
    ) -> Result<Vec<FoundUser>, DirectoryError> {
        self.call(ctx, || self.inner.find_users(criteria, attributes, ctx))
    }

    fn get_user_groups(
        &self,
        user: &str,
        ctx: &ResolveContext,
    ) -> Result<BTreeSet<String>, DirectoryError> {
        self.call(ctx, || self.inner.get_user_groups(user, ctx))
    }

    fn is_group_member(
        &self,
        user: &str,
        group: &str,
        ctx: &ResolveContext,
    ) -> Result<bool, DirectoryError> {
        self.call(ctx, || self.inner.is_group_member(user, group, ctx))
    }

    fn get_parent_groups(
        &self,
        group: &str,
        ctx: &ResolveContext,
    ) -> Result<BTreeSet<String>, DirectoryError> {
        self.call(ctx, || self.inner.get_parent_groups(group, ctx))
    }
}

impl GroupProvider for SlowDirectory {
    fn resolve_group(
        &self,
        group: &str,
        ctx: &ResolveContext,
    ) -> Result<Option<Vec<Principal>>, DirectoryError> {
        self.call(ctx, || self.inner.resolve_group(group, ctx))
    }
}

impl RoleSource for SlowDirectory {
    fn roles_for_user(
        &self,
        user: &str,
        ctx: &ResolveContext,
    ) -> Result<BTreeSet<String>, DirectoryError> {
        self.call(ctx, || self.inner.roles_for_user(user, ctx))
    }

    fn roles_for_group(
        &self,
        group: &str,
        ctx: &ResolveContext,
    ) -> Result<BTreeSet<String>, DirectoryError> {
        self.call(ctx, || self.inner.roles_for_group(group, ctx))
    }

    fn role_members(
        &self,
        role: &str,
        ctx: &ResolveContext,
    ) -> Result<Vec<Principal>, DirectoryError> {
        self.call(ctx, || self.inner.role_members(role, ctx))
    }

    fn roles_for_community(
        &self,
        community: &str,
        ctx: &ResolveContext,
    ) -> Result<BTreeSet<String>, DirectoryError> {
        self.call(ctx, || self.inner.roles_for_community(community, ctx))
    }
}
