use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::str::FromStr;

/// The class of identity a principal or ACL entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    User,
    Group,
    Role,
}

impl PrincipalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::User => "user",
            PrincipalKind::Group => "group",
            PrincipalKind::Role => "role",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrincipalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(PrincipalKind::User),
            "group" => Ok(PrincipalKind::Group),
            "role" => Ok(PrincipalKind::Role),
            other => Err(format!(
                "unknown principal kind `{other}` (expected user, group or role)"
            )),
        }
    }
}

/// A named identity. Carries no permission state.
///
/// Equality and hashing fold the name to lower case, so `User:Alice` and
/// `User:alice` are the same principal. The original spelling is kept for
/// display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub name: String,
    pub kind: PrincipalKind,
}

impl Principal {
    pub fn new(kind: PrincipalKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self::new(PrincipalKind::User, name)
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(PrincipalKind::Group, name)
    }

    pub fn role(name: impl Into<String>) -> Self {
        Self::new(PrincipalKind::Role, name)
    }

    /// Lower-cased name used for all lookups.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    /// Parse "kind/name", e.g. "group/editors".
    pub fn parse(s: &str) -> Option<Self> {
        let (kind, name) = s.split_once('/')?;
        if name.is_empty() {
            return None;
        }
        Some(Self::new(kind.parse().ok()?, name))
    }
}

impl PartialEq for Principal {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name.to_lowercase() == other.name.to_lowercase()
    }
}

impl Eq for Principal {}

impl std::hash::Hash for Principal {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.name.to_lowercase().hash(state);
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Every principal attached to one authenticated session.
///
/// Order of insertion is kept because the decision engine scans users,
/// groups and roles in that order. Duplicates are dropped on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrincipalSet {
    users: Vec<Principal>,
    groups: Vec<Principal>,
    roles: Vec<Principal>,
}

impl PrincipalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_principals<I>(principals: I) -> Self
    where
        I: IntoIterator<Item = Principal>,
    {
        let mut set = Self::new();
        for p in principals {
            set.insert(p);
        }
        set
    }

    pub fn with_user(mut self, name: impl Into<String>) -> Self {
        self.insert(Principal::user(name));
        self
    }

    pub fn with_group(mut self, name: impl Into<String>) -> Self {
        self.insert(Principal::group(name));
        self
    }

    pub fn with_role(mut self, name: impl Into<String>) -> Self {
        self.insert(Principal::role(name));
        self
    }

    /// Returns false when an equal principal was already present.
    pub fn insert(&mut self, principal: Principal) -> bool {
        let bucket = match principal.kind {
            PrincipalKind::User => &mut self.users,
            PrincipalKind::Group => &mut self.groups,
            PrincipalKind::Role => &mut self.roles,
        };
        if bucket.contains(&principal) {
            return false;
        }
        bucket.push(principal);
        true
    }

    pub fn users(&self) -> &[Principal] {
        &self.users
    }

    pub fn groups(&self) -> &[Principal] {
        &self.groups
    }

    pub fn roles(&self) -> &[Principal] {
        &self.roles
    }

    pub fn contains(&self, principal: &Principal) -> bool {
        match principal.kind {
            PrincipalKind::User => self.users.contains(principal),
            PrincipalKind::Group => self.groups.contains(principal),
            PrincipalKind::Role => self.roles.contains(principal),
        }
    }

    /// True when at least one user principal is present, i.e. a login was attempted.
    pub fn is_authenticated(&self) -> bool {
        !self.users.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.groups.is_empty() && self.roles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.users.len() + self.groups.len() + self.roles.len()
    }

    /// Users, then groups, then roles.
    pub fn iter(&self) -> impl Iterator<Item = &Principal> {
        self.users
            .iter()
            .chain(self.groups.iter())
            .chain(self.roles.iter())
    }
}

impl FromIterator<Principal> for PrincipalSet {
    fn from_iter<I: IntoIterator<Item = Principal>>(iter: I) -> Self {
        Self::from_principals(iter)
    }
}

/// Capability bitmask. Bit meanings belong to the embedding system.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AccessLevel(pub u32);

impl AccessLevel {
    pub const NONE: AccessLevel = AccessLevel(0);

    pub fn bits(&self) -> u32 {
        self.0
    }

    /// True when every bit of `required` is set.
    pub fn contains(&self, required: AccessLevel) -> bool {
        self.0 & required.0 == required.0
    }
}

impl From<u32> for AccessLevel {
    fn from(value: u32) -> Self {
        AccessLevel(value)
    }
}

impl BitAnd for AccessLevel {
    type Output = AccessLevel;

    fn bitand(self, rhs: Self) -> Self::Output {
        AccessLevel(self.0 & rhs.0)
    }
}

impl BitOr for AccessLevel {
    type Output = AccessLevel;

    fn bitor(self, rhs: Self) -> Self::Output {
        AccessLevel(self.0 | rhs.0)
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#b})", self.0, self.0)
    }
}

/// How levels are merged when several group/role entries match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CombinationPolicy {
    /// Numeric minimum.
    Min,
    /// Numeric maximum.
    Max,
    /// Bitwise AND.
    MergedMin,
    /// Bitwise OR.
    #[default]
    MergedMax,
}

impl CombinationPolicy {
    /// Fold `levels` under this policy. Returns `None` for an empty input.
    pub fn combine<I>(&self, levels: I) -> Option<AccessLevel>
    where
        I: IntoIterator<Item = AccessLevel>,
    {
        let mut iter = levels.into_iter();
        let first = iter.next()?;
        Some(iter.fold(first, |acc, level| match self {
            CombinationPolicy::Min => acc.min(level),
            CombinationPolicy::Max => acc.max(level),
            CombinationPolicy::MergedMin => acc & level,
            CombinationPolicy::MergedMax => acc | level,
        }))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CombinationPolicy::Min => "min",
            CombinationPolicy::Max => "max",
            CombinationPolicy::MergedMin => "merged-min",
            CombinationPolicy::MergedMax => "merged-max",
        }
    }
}

impl fmt::Display for CombinationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CombinationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "min" => Ok(CombinationPolicy::Min),
            "max" => Ok(CombinationPolicy::Max),
            "merged-min" | "mergedmin" => Ok(CombinationPolicy::MergedMin),
            "merged-max" | "mergedmax" => Ok(CombinationPolicy::MergedMax),
            other => Err(format!(
                "unknown combination policy `{other}` (expected min, max, merged-min or merged-max)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    pub name: String,
    pub kind: PrincipalKind,
    pub access_level: AccessLevel,
}

impl AclEntry {
    pub fn new(kind: PrincipalKind, name: impl Into<String>, access_level: AccessLevel) -> Self {
        Self {
            name: name.into(),
            kind,
            access_level,
        }
    }

    pub fn user(name: impl Into<String>, level: u32) -> Self {
        Self::new(PrincipalKind::User, name, AccessLevel(level))
    }

    pub fn group(name: impl Into<String>, level: u32) -> Self {
        Self::new(PrincipalKind::Group, name, AccessLevel(level))
    }

    pub fn role(name: impl Into<String>, level: u32) -> Self {
        Self::new(PrincipalKind::Role, name, AccessLevel(level))
    }
}

/// Declarative ACL for one protected resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    /// Identifier of the protected resource, e.g. "documents"
    pub resource: String,
    pub entries: Vec<AclEntry>,
    #[serde(default)]
    pub policy: CombinationPolicy,
}

impl Acl {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            entries: Vec::new(),
            policy: CombinationPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CombinationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_entry(mut self, entry: AclEntry) -> Self {
        self.entries.push(entry);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_principal_case_insensitive_eq() {
        assert_eq!(Principal::user("Alice"), Principal::user("ALICE"));
        assert_ne!(Principal::user("alice"), Principal::group("alice"));

        let mut set = HashSet::new();
        set.insert(Principal::group("Editors"));
        assert!(set.contains(&Principal::group("editors")));
    }

    #[test]
    fn test_principal_parse() {
        let p = Principal::parse("group/editors").unwrap();
        assert_eq!(p.kind, PrincipalKind::Group);
        assert_eq!(p.name, "editors");
        assert_eq!(p.to_string(), "group/editors");

        assert!(Principal::parse("editors").is_none());
        assert!(Principal::parse("team/editors").is_none());
        assert!(Principal::parse("user/").is_none());
    }

    #[test]
    fn test_principal_set_dedup_and_order() {
        let mut set = PrincipalSet::new()
            .with_role("r1")
            .with_group("g1")
            .with_user("alice");
        assert!(!set.insert(Principal::user("ALICE")));
        assert!(set.insert(Principal::user("ldap/alice")));

        let order: Vec<String> = set.iter().map(|p| p.to_string()).collect();
        assert_eq!(
            order,
            vec!["user/alice", "user/ldap/alice", "group/g1", "role/r1"]
        );
        assert_eq!(set.len(), 4);
        assert!(set.is_authenticated());
    }

    #[test]
    fn test_combine_policies() {
        let levels = [AccessLevel(0b0110), AccessLevel(0b0011), AccessLevel(0b1010)];
        assert_eq!(CombinationPolicy::Min.combine(levels), Some(AccessLevel(0b0011)));
        assert_eq!(CombinationPolicy::Max.combine(levels), Some(AccessLevel(0b1010)));
        assert_eq!(CombinationPolicy::MergedMin.combine(levels), Some(AccessLevel(0b0010)));
        assert_eq!(CombinationPolicy::MergedMax.combine(levels), Some(AccessLevel(0b1111)));
        assert_eq!(CombinationPolicy::MergedMax.combine([]), None);
    }

    #[test]
    fn test_merged_max_order_independent() {
        let a = AccessLevel(0b001);
        let b = AccessLevel(0b100);
        let c = AccessLevel(0b110);
        let orders = [[a, b, c], [c, b, a], [b, a, c], [c, a, b]];
        let results: HashSet<_> = orders
            .iter()
            .map(|o| CombinationPolicy::MergedMax.combine(o.iter().copied()))
            .collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results.into_iter().next().flatten(), Some(AccessLevel(0b111)));
    }

    #[test]
    fn test_merged_min_identity() {
        let level = AccessLevel(0b1011);
        assert_eq!(CombinationPolicy::MergedMin.combine([level]), Some(level));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("merged-max".parse::<CombinationPolicy>(), Ok(CombinationPolicy::MergedMax));
        assert_eq!("MERGED_MIN".parse::<CombinationPolicy>(), Ok(CombinationPolicy::MergedMin));
        assert_eq!("min".parse::<CombinationPolicy>(), Ok(CombinationPolicy::Min));
        assert!("average".parse::<CombinationPolicy>().is_err());
        assert_eq!(CombinationPolicy::default(), CombinationPolicy::MergedMax);
    }

    #[test]
    fn test_access_level_contains() {
        let level = AccessLevel(0b110);
        assert!(level.contains(AccessLevel(0b100)));
        assert!(level.contains(AccessLevel::NONE));
        assert!(!level.contains(AccessLevel(0b001)));
    }
}
