use std::collections::HashMap;

use crate::acl::errors::AclError;
use crate::acl::types::{Acl, AclEntry, CombinationPolicy, PrincipalKind};

/// Read-only lookup structure built once from an [`Acl`].
///
/// Each map goes from lower-cased principal name to the position of the
/// originating entry in `acl.entries`. Never mutated after `build`; a changed
/// ACL gets a fresh index.
#[derive(Debug, Clone)]
pub struct AclIndex {
    acl: Acl,
    by_user: HashMap<String, usize>,
    by_group: HashMap<String, usize>,
    by_role: HashMap<String, usize>,
}

impl AclIndex {
    /// Classify every entry by kind. On duplicate (kind, name) the later entry wins.
    pub fn build(acl: Acl) -> Result<Self, AclError> {
        if acl.resource.trim().is_empty() {
            return Err(AclError::InvalidAcl("resource name is empty".into()));
        }

        let mut by_user = HashMap::new();
        let mut by_group = HashMap::new();
        let mut by_role = HashMap::new();

        for (pos, entry) in acl.entries.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(AclError::InvalidAcl(format!(
                    "entry #{pos} ({}) of `{}` has an empty name",
                    entry.kind, acl.resource
                )));
            }
            let map = match entry.kind {
                PrincipalKind::User => &mut by_user,
                PrincipalKind::Group => &mut by_group,
                PrincipalKind::Role => &mut by_role,
            };
            if let Some(previous) = map.insert(entry.name.to_lowercase(), pos) {
                tracing::debug!(
                    resource = %acl.resource,
                    kind = %entry.kind,
                    name = %entry.name,
                    previous,
                    replaced_by = pos,
                    "duplicate ACL entry, later entry wins"
                );
            }
        }

        Ok(Self {
            acl,
            by_user,
            by_group,
            by_role,
        })
    }

    /// Case-insensitive lookup.
    pub fn lookup(&self, kind: PrincipalKind, name: &str) -> Option<&AclEntry> {
        let map = match kind {
            PrincipalKind::User => &self.by_user,
            PrincipalKind::Group => &self.by_group,
            PrincipalKind::Role => &self.by_role,
        };
        map.get(&name.to_lowercase())
            .and_then(|&pos| self.acl.entries.get(pos))
    }

    pub fn acl(&self) -> &Acl {
        &self.acl
    }

    pub fn resource(&self) -> &str {
        &self.acl.resource
    }

    pub fn policy(&self) -> CombinationPolicy {
        self.acl.policy
    }

    /// Number of distinct (kind, name) keys; can be lower than the entry count.
    pub fn len(&self) -> usize {
        self.by_user.len() + self.by_group.len() + self.by_role.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
