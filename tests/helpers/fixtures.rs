use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// On-disk layout for file-backed tests: ACL definitions under `acl/`,
/// directory sources and the config file at the root.
/// The directory is removed when this is dropped.
pub struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir(dir.path().join("acl")).expect("Failed to create acl dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn acl_dir(&self) -> PathBuf {
        self.dir.path().join("acl")
    }

    pub fn write_acl(&self, file_name: &str, kdl: &str) -> PathBuf {
        let path = self.acl_dir().join(file_name);
        fs::write(&path, kdl).expect("Failed to write ACL file");
        path
    }

    pub fn write_directory(&self, file_name: &str, json: &str) -> PathBuf {
        let path = self.dir.path().join(file_name);
        fs::write(&path, json).expect("Failed to write directory file");
        path
    }

    /// Write `config.toml` pointing at this environment's ACL dir and the
    /// given directory sources, followed by `extra` verbatim.
    pub fn write_config(&self, sources: &[PathBuf], extra: &str) -> PathBuf {
        let sources = sources
            .iter()
            .map(|p| format!("{:?}", p.display().to_string()))
            .collect::<Vec<_>>()
            .join(", ");
        let content = format!(
            "[acl]\npolicies_dir = {:?}\n\n[directory]\nsources = [{}]\n{}\n",
            self.acl_dir().display().to_string(),
            sources,
            extra
        );
        let path = self.dir.path().join("config.toml");
        fs::write(&path, content).expect("Failed to write config");
        path
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
