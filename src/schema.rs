//! Table layout shared by the metrics and review stores.
//!
//! Used by `review-sync init` to bootstrap empty stores. All statements are
//! `CREATE TABLE IF NOT EXISTS`, so running them against a populated store
//! leaves its data alone.

use sqlx::SqlitePool;

use crate::db::Store;
use crate::error::{Result, SyncError};

const DOCUMENTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        filename TEXT,
        status TEXT,
        ocr_confidence REAL,
        json_confidence REAL,
        correction_count INTEGER,
        flagged_for_review INTEGER,
        review_status TEXT,
        created_at TIMESTAMP,
        updated_at TIMESTAMP
    )
"#;

const ISSUES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS document_issues (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        document_id TEXT,
        issue_type TEXT,
        issue_details TEXT,
        created_at TIMESTAMP,
        FOREIGN KEY (document_id) REFERENCES documents(id)
    )
"#;

const FEEDBACK_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS review_feedback (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        document_id TEXT,
        status TEXT,
        changes_made INTEGER,
        reason TEXT,
        fields_corrected TEXT,
        timestamp TIMESTAMP,
        reviewer TEXT,
        FOREIGN KEY (document_id) REFERENCES documents(id)
    )
"#;

const CORRECTIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS field_corrections (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        document_id TEXT,
        field_name TEXT,
        original_value TEXT,
        corrected_value TEXT,
        timestamp TIMESTAMP,
        FOREIGN KEY (document_id) REFERENCES documents(id)
    )
"#;

pub async fn create_metrics_schema(pool: &SqlitePool) -> Result<()> {
    create_tables(pool, Store::Metrics).await
}

pub async fn create_review_schema(pool: &SqlitePool) -> Result<()> {
    create_tables(pool, Store::Review).await
}

async fn create_tables(pool: &SqlitePool, store: Store) -> Result<()> {
    let mut statements = vec![DOCUMENTS_TABLE, ISSUES_TABLE];
    if store == Store::Review {
        statements.extend([FEEDBACK_TABLE, CORRECTIONS_TABLE]);
    }

    for sql in statements {
        sqlx::query(sql)
            .execute(pool)
            .await
            .map_err(|source| SyncError::Query { store, source })?;
    }

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_document_issues_document_id ON document_issues(document_id)")
        .execute(pool)
        .await
        .map_err(|source| SyncError::Query { store, source })?;

    Ok(())
}
