use crate::acl::errors::AccessError;
use crate::acl::index::AclIndex;
use crate::acl::types::{AccessLevel, CombinationPolicy, Principal, PrincipalKind, PrincipalSet};

/// User entry applied to any authenticated session that matched nothing else.
pub const DEFAULT_USER: &str = "Default";
/// User entry applied to every session that matched nothing else.
pub const ANONYMOUS_USER: &str = "Anonymous";

/// Which step of the evaluation produced a grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionSource {
    /// Direct user entry match.
    User(String),
    /// Exactly one group or role entry matched.
    Single(Principal),
    /// Several group/role entries matched and were merged.
    Combined {
        matched: usize,
        policy: CombinationPolicy,
    },
    /// The `Default` user entry.
    Default,
    /// The `Anonymous` user entry.
    Anonymous,
}

impl std::fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionSource::User(name) => write!(f, "user entry `{name}`"),
            DecisionSource::Single(principal) => {
                write!(f, "{} entry `{}`", principal.kind, principal.name)
            }
            DecisionSource::Combined { matched, policy } => {
                write!(f, "{matched} group/role entries combined with {policy}")
            }
            DecisionSource::Default => write!(f, "`{DEFAULT_USER}` entry"),
            DecisionSource::Anonymous => write!(f, "`{ANONYMOUS_USER}` entry"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Granted {
        level: AccessLevel,
        source: DecisionSource,
    },
    AuthenticationRequired,
    AuthorizationDenied,
}

impl AccessDecision {
    pub fn level(&self) -> Option<AccessLevel> {
        match self {
            AccessDecision::Granted { level, .. } => Some(*level),
            _ => None,
        }
    }

    pub fn into_result(self, resource: &str) -> Result<AccessLevel, AccessError> {
        match self {
            AccessDecision::Granted { level, .. } => Ok(level),
            AccessDecision::AuthenticationRequired => Err(AccessError::AuthenticationRequired {
                resource: resource.to_string(),
            }),
            AccessDecision::AuthorizationDenied => Err(AccessError::AuthorizationDenied {
                resource: resource.to_string(),
            }),
        }
    }
}

/// Evaluate `principals` against `index`.
///
/// Order matters: a direct user match returns before any group or role is
/// considered; groups are collected before roles.
pub fn decide(principals: &PrincipalSet, index: &AclIndex) -> AccessDecision {
    // 1. Direct user match short-circuits
    for user in principals.users() {
        if let Some(entry) = index.lookup(PrincipalKind::User, &user.name) {
            return AccessDecision::Granted {
                level: entry.access_level,
                source: DecisionSource::User(entry.name.clone()),
            };
        }
    }

    // 2. Collect group hits, then role hits
    let candidates: Vec<(&Principal, AccessLevel)> = principals
        .groups()
        .iter()
        .chain(principals.roles().iter())
        .filter_map(|p| index.lookup(p.kind, &p.name).map(|e| (p, e.access_level)))
        .collect();

    match candidates.as_slice() {
        // 3. Fallbacks
        [] => fallback(principals, index),
        // 4. Single candidate
        [(principal, level)] => AccessDecision::Granted {
            level: *level,
            source: DecisionSource::Single((*principal).clone()),
        },
        // 5. Merge
        many => {
            let policy = index.policy();
            let level = policy
                .combine(many.iter().map(|(_, level)| *level))
                .unwrap_or(AccessLevel::NONE);
            AccessDecision::Granted {
                level,
                source: DecisionSource::Combined {
                    matched: many.len(),
                    policy,
                },
            }
        }
    }
}

fn fallback(principals: &PrincipalSet, index: &AclIndex) -> AccessDecision {
    if principals.is_authenticated() {
        if let Some(entry) = index.lookup(PrincipalKind::User, DEFAULT_USER) {
            return AccessDecision::Granted {
                level: entry.access_level,
                source: DecisionSource::Default,
            };
        }
    }

    if let Some(entry) = index.lookup(PrincipalKind::User, ANONYMOUS_USER) {
        return AccessDecision::Granted {
            level: entry.access_level,
            source: DecisionSource::Anonymous,
        };
    }

    if principals.is_authenticated() {
        AccessDecision::AuthorizationDenied
    } else {
        AccessDecision::AuthenticationRequired
    }
}

/// Effective access level of `principals` on the resource behind `index`.
pub fn get_access_level(
    principals: &PrincipalSet,
    index: &AclIndex,
) -> Result<AccessLevel, AccessError> {
    let decision = decide(principals, index);
    tracing::trace!(resource = index.resource(), ?decision, "access decision");
    decision.into_result(index.resource())
}

/// True when the granted level carries every bit of `required`.
/// A failed decision is an error, not `false`.
pub fn has_access(
    principals: &PrincipalSet,
    index: &AclIndex,
    required: AccessLevel,
) -> Result<bool, AccessError> {
    get_access_level(principals, index).map(|level| level.contains(required))
}
