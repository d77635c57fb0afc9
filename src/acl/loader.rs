use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::acl::errors::AclError;
use crate::acl::index::AclIndex;
use crate::acl::policy::parse_kdl_document;
use crate::acl::types::Acl;

/// Compiled ACLs keyed by resource name.
/// Immutable after construction; reloading builds a new registry.
#[derive(Debug, Clone, Default)]
pub struct AclRegistry {
    indexes: HashMap<String, Arc<AclIndex>>,
}

impl AclRegistry {
    pub fn get(&self, resource: &str) -> Option<Arc<AclIndex>> {
        self.indexes.get(resource).cloned()
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.indexes.keys().map(|k| k.as_str())
    }
}

/// Load all `.kdl` files from the given directory and index every ACL in them.
pub fn load_acls(dir: &Path) -> Result<AclRegistry, AclError> {
    if !dir.is_dir() {
        return Err(AclError::InvalidAcl(format!(
            "ACL directory `{}` does not exist or is not a directory",
            dir.display()
        )));
    }

    let mut all_parsed = Vec::new();
    let mut file_count = 0;

    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "kdl")
                .unwrap_or(false)
        })
        .collect();
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();
        let contents =
            std::fs::read_to_string(&path).map_err(|source| AclError::PolicyLoadError {
                path: path.display().to_string(),
                source,
            })?;
        all_parsed.extend(parse_kdl_document(&contents)?);
        file_count += 1;
    }

    let registry = compile_acls(all_parsed)?;

    tracing::info!(
        files = file_count,
        acls = registry.len(),
        "Loaded access control lists"
    );

    Ok(registry)
}

/// Index every ACL. A resource defined twice keeps the later definition.
pub fn compile_acls(acls: Vec<Acl>) -> Result<AclRegistry, AclError> {
    let mut indexes = HashMap::new();
    for acl in acls {
        let resource = acl.resource.clone();
        let index = AclIndex::build(acl)?;
        if indexes.insert(resource.clone(), Arc::new(index)).is_some() {
            tracing::warn!(%resource, "ACL defined more than once, later definition wins");
        }
    }
    Ok(AclRegistry { indexes })
}
