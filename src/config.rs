use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::db::{StorePaths, DEFAULT_METRICS_PATH, DEFAULT_REVIEW_PATH};

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./config/review-sync.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub stores: StoresConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProjectConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

/// Store locations. Relative paths resolve against `project.root`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoresConfig {
    #[serde(default)]
    pub metrics: Option<PathBuf>,
    #[serde(default)]
    pub review: Option<PathBuf>,
}

impl Config {
    /// Resolve both store paths, falling back to the default layout.
    pub fn store_paths(&self) -> StorePaths {
        let root = &self.project.root;
        let resolve = |configured: &Option<PathBuf>, default: &str| match configured {
            Some(path) => root.join(path),
            None => root.join(default),
        };

        StorePaths {
            metrics: resolve(&self.stores.metrics, DEFAULT_METRICS_PATH),
            review: resolve(&self.stores.review, DEFAULT_REVIEW_PATH),
        }
    }
}

/// Reject a layout that points both stores at the same file.
pub fn validate_paths(paths: &StorePaths) -> Result<()> {
    if paths.same_file() {
        anyhow::bail!(
            "metrics and review stores must be different files (both are {})",
            paths.metrics.display()
        );
    }
    Ok(())
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.project.root.as_os_str().is_empty() {
        anyhow::bail!("project.root must not be empty");
    }

    validate_paths(&config.store_paths())?;

    Ok(config)
}

/// Load `path` if given, otherwise the default config file if it exists,
/// otherwise built-in defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                load_config(default_path)
            } else {
                Ok(Config::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(tmp: &TempDir, content: &str) -> PathBuf {
        let path = tmp.path().join("review-sync.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_file() {
        let config = Config::default();
        let paths = config.store_paths();
        assert_eq!(paths.metrics, PathBuf::from("./data/metrics.db"));
        assert_eq!(paths.review, PathBuf::from("./review/review.db"));
    }

    #[test]
    fn test_relative_paths_resolve_against_root() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            r#"
[project]
root = "/srv/skilllab"

[stores]
metrics = "var/metrics.db"
review = "/mnt/review/review.db"
"#,
        );

        let paths = load_config(&path).unwrap().store_paths();
        assert_eq!(paths.metrics, PathBuf::from("/srv/skilllab/var/metrics.db"));
        assert_eq!(paths.review, PathBuf::from("/mnt/review/review.db"));
    }

    #[test]
    fn test_same_file_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            r#"
[stores]
metrics = "shared.db"
review = "shared.db"
"#,
        );

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("different files"));
    }

    #[test]
    fn test_explicit_missing_config_is_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.toml");
        assert!(load_or_default(Some(&missing)).is_err());
    }
}
