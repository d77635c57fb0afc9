use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::EngineError;
use crate::resolve::DEFAULT_MAX_GROUP_DEPTH;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub acl: AclSettings,
    #[serde(default)]
    pub directory: DirectorySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AclSettings {
    /// Directory holding `*.kdl` ACL definitions. Default: acl
    pub policies_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorySettings {
    /// Directory JSON files, queried in this order
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    /// Nesting levels followed when expanding groups
    #[serde(default = "default_max_group_depth")]
    pub max_group_depth: usize,
    /// Budget of a single directory call; unbounded if unset
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Restrict resolved groups and roles to this community
    #[serde(default)]
    pub community: Option<String>,
}

fn default_max_group_depth() -> usize {
    DEFAULT_MAX_GROUP_DEPTH
}

impl Default for AclSettings {
    fn default() -> Self {
        Self {
            policies_dir: PathBuf::from("acl"),
        }
    }
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            max_group_depth: DEFAULT_MAX_GROUP_DEPTH,
            timeout_ms: None,
            community: None,
        }
    }
}

impl DirectorySettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Self, EngineError> {
        let mut builder = config::Config::builder()
            .set_default(
                "acl.policies_dir",
                AclSettings::default()
                    .policies_dir
                    .to_string_lossy()
                    .to_string(),
            )?
            .set_default("directory.max_group_depth", DEFAULT_MAX_GROUP_DEPTH as u64)?;

        // Optional file
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment overrides: ACLENGINE__DIRECTORY__TIMEOUT_MS=500, etc.
        builder = builder.add_source(
            config::Environment::with_prefix("ACLENGINE")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("directory.sources"),
        );

        let cfg = builder.build()?;
        let mut s: Settings = cfg.try_deserialize()?;

        // Normalize paths to be relative to current dir
        let cwd = std::env::current_dir()?;
        if s.acl.policies_dir.is_relative() {
            s.acl.policies_dir = cwd.join(&s.acl.policies_dir);
        }
        for source in s.directory.sources.iter_mut() {
            if source.is_relative() {
                *source = cwd.join(&*source);
            }
        }

        Ok(s)
    }
}
