//! Issue pass: copy metrics-store issues the review store does not have yet.
//!
//! Issues are immutable facts keyed by `(document_id, issue_type,
//! issue_details)`. A key already present on the review side is treated as
//! synced regardless of its timestamp, so there is no update path.

use sqlx::SqliteConnection;
use std::collections::HashSet;

use crate::error::{Result, SyncError};
use crate::models::{Issue, IssueKey};
use crate::sync::SyncReport;

pub(crate) async fn load_issues(conn: &mut SqliteConnection) -> sqlx::Result<Vec<Issue>> {
    sqlx::query_as::<_, Issue>(
        "SELECT document_id, issue_type, issue_details, created_at FROM document_issues",
    )
    .fetch_all(conn)
    .await
}

pub async fn sync_issues(
    metrics: &mut SqliteConnection,
    review: &mut SqliteConnection,
    report: &mut SyncReport,
) -> Result<()> {
    let metrics_issues = load_issues(metrics).await.map_err(SyncError::metrics)?;

    let mut known: HashSet<IssueKey> = load_issues(&mut *review)
        .await
        .map_err(SyncError::review)?
        .iter()
        .map(Issue::key)
        .collect();

    for issue in &metrics_issues {
        // Extending the set as we go also collapses duplicates within the metrics store.
        if !known.insert(issue.key()) {
            continue;
        }

        sqlx::query(
            r#"
            INSERT INTO document_issues (document_id, issue_type, issue_details, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&issue.document_id)
        .bind(&issue.issue_type)
        .bind(&issue.issue_details)
        .bind(&issue.created_at)
        .execute(&mut *review)
        .await
        .map_err(SyncError::review)?;

        report.issues_inserted += 1;
    }

    Ok(())
}
