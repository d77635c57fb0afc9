use aclengine::acl::{Acl, AclEntry, AclIndex, CombinationPolicy, PrincipalSet};

/// Builder for test ACLs
pub struct AclBuilder {
    resource: String,
    policy: CombinationPolicy,
    entries: Vec<AclEntry>,
}

impl AclBuilder {
    pub fn new(resource: &str) -> Self {
        Self {
            resource: resource.to_string(),
            policy: CombinationPolicy::default(),
            entries: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: CombinationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn user(mut self, name: &str, level: u32) -> Self {
        self.entries.push(AclEntry::user(name, level));
        self
    }

    pub fn group(mut self, name: &str, level: u32) -> Self {
        self.entries.push(AclEntry::group(name, level));
        self
    }

    pub fn role(mut self, name: &str, level: u32) -> Self {
        self.entries.push(AclEntry::role(name, level));
        self
    }

    pub fn acl(self) -> Acl {
        self.entries
            .into_iter()
            .fold(Acl::new(self.resource).with_policy(self.policy), |acl, entry| {
                acl.with_entry(entry)
            })
    }

    pub fn build(self) -> AclIndex {
        AclIndex::build(self.acl()).expect("Failed to index test ACL")
    }
}

/// Builder for hand-made principal sets, bypassing directory resolution
#[derive(Default)]
pub struct SessionBuilder {
    set: PrincipalSet,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, name: &str) -> Self {
        self.set = self.set.with_user(name);
        self
    }

    pub fn group(mut self, name: &str) -> Self {
        self.set = self.set.with_group(name);
        self
    }

    pub fn role(mut self, name: &str) -> Self {
        self.set = self.set.with_role(name);
        self
    }

    pub fn build(self) -> PrincipalSet {
        self.set
    }
}
