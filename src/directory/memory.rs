use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::acl::types::Principal;
use crate::directory::errors::DirectoryError;
use crate::directory::filter::FilterCriteria;
use crate::directory::{
    DirectoryCatalogAdapter, DirectorySource, FoundUser, GroupProvider, ResolveContext, RoleSource,
};

/// User definition from a directory file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    #[serde(default)]
    pub attributes: HashMap<String, Vec<String>>,
}

/// Group definition; members may be users or nested groups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRecord {
    pub name: String,
    #[serde(default)]
    pub members: Vec<Principal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRecord {
    pub name: String,
    #[serde(default)]
    pub members: Vec<Principal>,
    /// Community (tenant) this role is scoped to
    #[serde(default)]
    pub community: Option<String>,
}

fn default_source_name() -> String {
    "memory".to_string()
}

/// Root structure of a directory JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryFile {
    #[serde(default = "default_source_name")]
    pub name: String,
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub groups: Vec<GroupRecord>,
    #[serde(default)]
    pub roles: Vec<RoleRecord>,
}

/// Identity source held entirely in memory.
///
/// Serves as the backend store and as a test double for external
/// directories. Group queries only report direct membership; nesting is
/// left to the group expansion service.
#[derive(Debug, Clone)]
pub struct MemoryDirectory {
    name: String,
    /// lower-cased name -> record
    users: HashMap<String, UserRecord>,
    groups: HashMap<String, GroupRecord>,
    roles: Vec<RoleRecord>,
}

impl MemoryDirectory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            users: HashMap::new(),
            groups: HashMap::new(),
            roles: Vec::new(),
        }
    }

    pub fn from_file_contents(file: DirectoryFile) -> Self {
        let mut dir = Self::new(file.name);
        for user in file.users {
            dir.add_user_record(user);
        }
        for group in file.groups {
            dir.add_group_record(group);
        }
        for role in file.roles {
            dir.add_role_record(role);
        }
        dir
    }

    /// Load a directory JSON file.
    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let content = fs::read_to_string(path).map_err(|e| DirectoryError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let file: DirectoryFile =
            serde_json::from_str(&content).map_err(|e| DirectoryError::Load {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let dir = Self::from_file_contents(file);
        tracing::info!(
            source = %dir.name,
            path = %path.display(),
            users = dir.users.len(),
            groups = dir.groups.len(),
            roles = dir.roles.len(),
            "Loaded directory source"
        );
        Ok(dir)
    }

    pub fn add_user_record(&mut self, user: UserRecord) {
        self.users.insert(user.name.to_lowercase(), user);
    }

    pub fn add_group_record(&mut self, group: GroupRecord) {
        self.groups.insert(group.name.to_lowercase(), group);
    }

    pub fn add_role_record(&mut self, role: RoleRecord) {
        self.roles.push(role);
    }

    pub fn with_user(mut self, name: &str, attributes: &[(&str, &str)]) -> Self {
        let mut attrs: HashMap<String, Vec<String>> = HashMap::new();
        for (k, v) in attributes {
            attrs.entry(k.to_string()).or_default().push(v.to_string());
        }
        self.add_user_record(UserRecord {
            name: name.to_string(),
            attributes: attrs,
        });
        self
    }

    pub fn with_group(mut self, name: &str, members: Vec<Principal>) -> Self {
        self.add_group_record(GroupRecord {
            name: name.to_string(),
            members,
        });
        self
    }

    pub fn with_role(
        mut self,
        name: &str,
        members: Vec<Principal>,
        community: Option<&str>,
    ) -> Self {
        self.add_role_record(RoleRecord {
            name: name.to_string(),
            members,
            community: community.map(str::to_string),
        });
        self
    }

    fn roles_with_member(&self, member: &Principal) -> BTreeSet<String> {
        self.roles
            .iter()
            .filter(|r| r.members.contains(member))
            .map(|r| r.name.clone())
            .collect()
    }

    fn select_attributes(
        record: &UserRecord,
        attributes: &[String],
    ) -> HashMap<String, Vec<String>> {
        attributes
            .iter()
            .filter_map(|a| record.attributes.get(a).map(|v| (a.clone(), v.clone())))
            .collect()
    }
}

impl DirectorySource for MemoryDirectory {
    fn name(&self) -> &str {
        &self.name
    }
}

impl DirectoryCatalogAdapter for MemoryDirectory {
    fn get_attributes(
        &self,
        principal: &str,
        attributes: &[String],
        _ctx: &ResolveContext,
    ) -> Result<HashMap<String, Vec<String>>, DirectoryError> {
        Ok(self
            .users
            .get(&principal.to_lowercase())
            .map(|u| Self::select_attributes(u, attributes))
            .unwrap_or_default())
    }

    fn find_users(
        &self,
        criteria: &FilterCriteria,
        attributes: &[String],
        _ctx: &ResolveContext,
    ) -> Result<Vec<FoundUser>, DirectoryError> {
        let mut found: Vec<FoundUser> = self
            .users
            .values()
            .filter(|u| criteria.matches(&u.name, &u.attributes))
            .map(|u| FoundUser {
                name: u.name.clone(),
                attributes: Self::select_attributes(u, attributes),
            })
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    fn get_user_groups(
        &self,
        user: &str,
        _ctx: &ResolveContext,
    ) -> Result<BTreeSet<String>, DirectoryError> {
        let member = Principal::user(user);
        Ok(self
            .groups
            .values()
            .filter(|g| g.members.contains(&member))
            .map(|g| g.name.clone())
            .collect())
    }

    fn is_group_member(
        &self,
        user: &str,
        group: &str,
        _ctx: &ResolveContext,
    ) -> Result<bool, DirectoryError> {
        let member = Principal::user(user);
        Ok(self
            .groups
            .get(&group.to_lowercase())
            .is_some_and(|g| g.members.contains(&member)))
    }

    fn get_parent_groups(
        &self,
        group: &str,
        _ctx: &ResolveContext,
    ) -> Result<BTreeSet<String>, DirectoryError> {
        let member = Principal::group(group);
        Ok(self
            .groups
            .values()
            .filter(|g| g.members.contains(&member))
            .map(|g| g.name.clone())
            .collect())
    }
}

impl GroupProvider for MemoryDirectory {
    fn resolve_group(
        &self,
        group: &str,
        _ctx: &ResolveContext,
    ) -> Result<Option<Vec<Principal>>, DirectoryError> {
        Ok(self
            .groups
            .get(&group.to_lowercase())
            .map(|g| g.members.clone()))
    }
}

impl RoleSource for MemoryDirectory {
    fn roles_for_user(
        &self,
        user: &str,
        _ctx: &ResolveContext,
    ) -> Result<BTreeSet<String>, DirectoryError> {
        Ok(self.roles_with_member(&Principal::user(user)))
    }

    fn roles_for_group(
        &self,
        group: &str,
        _ctx: &ResolveContext,
    ) -> Result<BTreeSet<String>, DirectoryError> {
        Ok(self.roles_with_member(&Principal::group(group)))
    }

    fn role_members(
        &self,
        role: &str,
        _ctx: &ResolveContext,
    ) -> Result<Vec<Principal>, DirectoryError> {
        Ok(self
            .roles
            .iter()
            .filter(|r| r.name == role)
            .flat_map(|r| r.members.iter().cloned())
            .collect())
    }

    fn roles_for_community(
        &self,
        community: &str,
        _ctx: &ResolveContext,
    ) -> Result<BTreeSet<String>, DirectoryError> {
        Ok(self
            .roles
            .iter()
            .filter(|r| r.community.as_deref() == Some(community))
            .map(|r| r.name.clone())
            .collect())
    }
}
