//! Store adapter: locating and opening the metrics and review databases.
//!
//! A missing store file is a normal state ("this side has no data"), not an
//! error. [`open_existing`] never creates a file; only [`create_store`], used
//! by `review-sync init`, does.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, SyncError};

/// Default metrics store location, relative to the project root.
pub const DEFAULT_METRICS_PATH: &str = "data/metrics.db";
/// Default review store location, relative to the project root.
pub const DEFAULT_REVIEW_PATH: &str = "review/review.db";

/// Which of the two stores a value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Store {
    /// Owned by the ingestion pipeline; authoritative for document content and issues.
    Metrics,
    /// Owned by the review interface; authoritative for human verdicts.
    Review,
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Store::Metrics => f.write_str("metrics"),
            Store::Review => f.write_str("review"),
        }
    }
}

/// File-system locations of both stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub metrics: PathBuf,
    pub review: PathBuf,
}

impl StorePaths {
    /// Default layout under a project root: `data/metrics.db` and `review/review.db`.
    pub fn for_project(root: &Path) -> Self {
        Self {
            metrics: root.join(DEFAULT_METRICS_PATH),
            review: root.join(DEFAULT_REVIEW_PATH),
        }
    }

    pub fn get(&self, store: Store) -> &Path {
        match store {
            Store::Metrics => &self.metrics,
            Store::Review => &self.review,
        }
    }

    /// True when both paths name the same file, following symlinks and
    /// relative components for files that exist.
    pub fn same_file(&self) -> bool {
        let canonical = |p: &Path| std::fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf());
        canonical(&self.metrics) == canonical(&self.review)
    }
}

/// Open a store only if its file already exists.
///
/// Returns `Ok(None)` for an absent store. The pool is limited to a single
/// connection so that one transaction spans everything written in a run.
pub async fn open_existing(store: Store, path: &Path) -> Result<Option<SqlitePool>> {
    if !path.exists() {
        debug!(%store, path = %path.display(), "store absent");
        return Ok(None);
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(false)
        .foreign_keys(false)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|source| SyncError::Open {
            store,
            path: path.to_path_buf(),
            source,
        })?;

    debug!(%store, path = %path.display(), "store opened");
    Ok(Some(pool))
}

/// Open a store, creating the file and its parent directory if needed.
pub async fn create_store(store: Store, path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(false)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|source| SyncError::Open {
            store,
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_layout() {
        let paths = StorePaths::for_project(Path::new("/srv/app"));
        assert_eq!(paths.metrics, PathBuf::from("/srv/app/data/metrics.db"));
        assert_eq!(paths.review, PathBuf::from("/srv/app/review/review.db"));
        assert_eq!(paths.get(Store::Review), Path::new("/srv/app/review/review.db"));
    }

    #[test]
    fn test_same_file_through_relative_components() {
        let tmp = TempDir::new().unwrap();
        let db = tmp.path().join("shared.db");
        std::fs::write(&db, b"").unwrap();

        let paths = StorePaths {
            metrics: db.clone(),
            review: tmp.path().join(".").join("shared.db"),
        };
        assert!(paths.same_file());
        assert!(!StorePaths::for_project(tmp.path()).same_file());
    }

    #[tokio::test]
    async fn test_foreign_keys_not_enforced() {
        let tmp = TempDir::new().unwrap();
        let pool = create_store(Store::Review, &tmp.path().join("review.db"))
            .await
            .unwrap();

        let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(enabled, 0);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_open_existing_does_not_create() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing.db");

        let pool = open_existing(Store::Review, &path).await.unwrap();
        assert!(pool.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_create_then_open() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("metrics.db");

        let pool = create_store(Store::Metrics, &path).await.unwrap();
        pool.close().await;
        assert!(path.exists());

        let reopened = open_existing(Store::Metrics, &path).await.unwrap();
        let pool = reopened.expect("store should exist");
        pool.close().await;
    }
}
