use crate::acl::errors::AclError;
use crate::acl::types::*;
use kdl::KdlDocument;

/// Parse a KDL document string into ACL definitions.
///
/// ```kdl
/// acl "documents" policy="merged-max" {
///     user "bob" level=4
///     group "editors" level=0b010
///     role "reviewers" level=0b100
/// }
/// ```
pub fn parse_kdl_document(source: &str) -> Result<Vec<Acl>, AclError> {
    let doc: KdlDocument = source
        .parse()
        .map_err(|e: kdl::KdlError| AclError::KdlParse(e.to_string()))?;

    let mut acls = Vec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "acl" => acls.push(parse_acl_node(node)?),
            other => {
                tracing::warn!("ignoring unknown top-level KDL node `{other}`");
            }
        }
    }

    Ok(acls)
}

fn parse_acl_node(node: &kdl::KdlNode) -> Result<Acl, AclError> {
    let resource = first_string_arg(node).ok_or_else(|| {
        AclError::InvalidAcl(
            "acl node requires a resource argument (e.g. acl \"documents\")".into(),
        )
    })?;

    let policy = match node.get("policy") {
        Some(value) => {
            let raw = value.as_string().ok_or_else(|| {
                AclError::InvalidAcl(format!("`policy` of acl `{resource}` must be a string"))
            })?;
            raw.parse::<CombinationPolicy>()
                .map_err(|e| AclError::InvalidAcl(format!("acl `{resource}`: {e}")))?
        }
        None => CombinationPolicy::default(),
    };

    let mut acl = Acl::new(resource).with_policy(policy);

    if let Some(children) = node.children() {
        for child in children.nodes() {
            let kind = match child.name().value() {
                "user" => PrincipalKind::User,
                "group" => PrincipalKind::Group,
                "role" => PrincipalKind::Role,
                other => {
                    return Err(AclError::InvalidEntry(format!(
                        "unexpected child `{other}` in acl `{}` (expected `user`, `group` or `role`)",
                        acl.resource
                    )));
                }
            };

            let name = first_string_arg(child).ok_or_else(|| {
                AclError::InvalidEntry(format!(
                    "{kind} entry in acl `{}` requires a name argument",
                    acl.resource
                ))
            })?;

            let level = child
                .get("level")
                .ok_or_else(|| {
                    AclError::InvalidEntry(format!(
                        "{kind} `{name}` in acl `{}` missing `level` property",
                        acl.resource
                    ))
                })?
                .as_integer()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| {
                    AclError::InvalidEntry(format!(
                        "{kind} `{name}` in acl `{}` has a `level` outside 0..=4294967295",
                        acl.resource
                    ))
                })?;

            acl.entries.push(AclEntry::new(kind, name, AccessLevel(level)));
        }
    }

    Ok(acl)
}

/// Extract the first string argument from a KDL node.
fn first_string_arg(node: &kdl::KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}
