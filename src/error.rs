//! Error types for store access and reconciliation.

use std::path::PathBuf;
use thiserror::Error;

use crate::db::Store;

/// Result type for store and reconciliation operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// A failure talking to one of the two stores.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The store file exists but could not be opened.
    #[error("failed to open {store} store at {}: {source}", .path.display())]
    Open {
        store: Store,
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    /// A statement against the store failed.
    #[error("{store} store query failed: {source}")]
    Query {
        store: Store,
        #[source]
        source: sqlx::Error,
    },

    /// Committing the store's transaction failed.
    #[error("failed to commit {store} store: {source}")]
    Commit {
        store: Store,
        #[source]
        source: sqlx::Error,
    },

    /// Both store paths resolve to one file.
    #[error("metrics and review stores must be different files (both are {})", .path.display())]
    SameStore { path: PathBuf },

    /// Filesystem error while preparing a store location.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    pub(crate) fn metrics(source: sqlx::Error) -> Self {
        SyncError::Query {
            store: Store::Metrics,
            source,
        }
    }

    pub(crate) fn review(source: sqlx::Error) -> Self {
        SyncError::Query {
            store: Store::Review,
            source,
        }
    }

    /// The store this error concerns, if any.
    pub fn store(&self) -> Option<Store> {
        match self {
            SyncError::Open { store, .. }
            | SyncError::Query { store, .. }
            | SyncError::Commit { store, .. } => Some(*store),
            SyncError::SameStore { .. } | SyncError::Io(_) => None,
        }
    }

    /// True when SQLite reported the database as busy or locked.
    ///
    /// These failures are transient; schema mismatches and IO errors are not.
    pub fn is_busy(&self) -> bool {
        let source = match self {
            SyncError::Open { source, .. }
            | SyncError::Query { source, .. }
            | SyncError::Commit { source, .. } => source,
            SyncError::SameStore { .. } | SyncError::Io(_) => return false,
        };

        match source {
            sqlx::Error::PoolTimedOut => true,
            sqlx::Error::Database(db) => db
                .code()
                .and_then(|code| code.parse::<u32>().ok())
                // Extended result codes carry the primary code in the low byte.
                .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
                .unwrap_or(false),
            _ => false,
        }
    }
}

const SQLITE_BUSY: u32 = 5;
const SQLITE_LOCKED: u32 = 6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_is_reported() {
        let err = SyncError::review(sqlx::Error::RowNotFound);
        assert_eq!(err.store(), Some(Store::Review));
        assert!(err.to_string().starts_with("review store query failed"));

        let io = SyncError::from(std::io::Error::other("disk gone"));
        assert_eq!(io.store(), None);
    }

    #[test]
    fn test_non_database_errors_are_not_busy() {
        assert!(!SyncError::metrics(sqlx::Error::RowNotFound).is_busy());
        assert!(SyncError::metrics(sqlx::Error::PoolTimedOut).is_busy());
        assert!(!SyncError::from(std::io::Error::other("x")).is_busy());
    }
}
