use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        Self {
            project_root: discover_project_root(),
        }
    }

    pub fn with_root(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    /// Relative paths are resolved against the project root.
    pub fn resolve(&self, raw: &Path) -> PathBuf {
        if raw.is_absolute() {
            return raw.to_path_buf();
        }
        self.project_root.join(raw)
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("ZIZ_ROOT") {
        if !root.trim().is_empty() {
            return PathBuf::from(root);
        }
    }

    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
