//! Review-status pass: copy finished human verdicts back to the metrics store.
//!
//! Every review-store document with a terminal `review_status` is resolved
//! against its most recent feedback row; the feedback status wins when one
//! exists. The metrics row is then overwritten unconditionally
//! (last writer wins), since the metrics side never writes `review_status`
//! itself.

use sqlx::SqliteConnection;

use crate::error::{Result, SyncError};
use crate::models::ReviewStatus;
use crate::sync::SyncReport;

/// A terminal review-store document and its latest feedback, if any.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CompletedReview {
    pub id: String,
    pub review_status: String,
    pub feedback_status: Option<String>,
}

impl CompletedReview {
    /// Feedback takes precedence over the document's own status.
    pub fn effective_status(&self) -> ReviewStatus {
        let status = self
            .feedback_status
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.review_status);
        ReviewStatus::parse(status)
    }
}

pub(crate) async fn completed_reviews(
    conn: &mut SqliteConnection,
) -> sqlx::Result<Vec<CompletedReview>> {
    let [approved, rejected, completed] = ReviewStatus::TERMINAL;

    let reviews = sqlx::query_as::<_, CompletedReview>(
        r#"
        SELECT d.id AS id,
               d.review_status AS review_status,
               (SELECT rf.status
                  FROM review_feedback rf
                 WHERE rf.document_id = d.id
                   AND rf.status IS NOT NULL
                   AND rf.status <> ''
                 ORDER BY rf.timestamp DESC, rf.id DESC
                 LIMIT 1) AS feedback_status
        FROM documents d
        WHERE d.id IS NOT NULL
          AND d.review_status IN (?, ?, ?)
        "#,
    )
    .bind(approved.as_str())
    .bind(rejected.as_str())
    .bind(completed.as_str())
    .fetch_all(conn)
    .await?;

    Ok(reviews)
}

/// Run the back-propagation pass. `synced_at` is written as `updated_at` on
/// every touched metrics row.
pub async fn propagate_review_status(
    review: &mut SqliteConnection,
    metrics: &mut SqliteConnection,
    synced_at: &str,
    report: &mut SyncReport,
) -> Result<()> {
    let reviews = completed_reviews(review).await.map_err(SyncError::review)?;

    for entry in &reviews {
        let status = entry.effective_status();
        let result = sqlx::query("UPDATE documents SET review_status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(synced_at)
            .bind(&entry.id)
            .execute(&mut *metrics)
            .await
            .map_err(SyncError::metrics)?;

        // Review-only documents have no metrics row to update.
        report.statuses_propagated += result.rows_affected();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(status: &str, feedback: Option<&str>) -> CompletedReview {
        CompletedReview {
            id: "doc1".to_string(),
            review_status: status.to_string(),
            feedback_status: feedback.map(str::to_string),
        }
    }

    #[test]
    fn test_feedback_wins() {
        assert_eq!(
            review("approved", Some("rejected")).effective_status(),
            ReviewStatus::Rejected
        );
    }

    #[test]
    fn test_falls_back_to_document_status() {
        assert_eq!(
            review("completed", None).effective_status(),
            ReviewStatus::Completed
        );
        assert_eq!(
            review("approved", Some("")).effective_status(),
            ReviewStatus::Approved
        );
    }

    #[test]
    fn test_non_terminal_feedback_is_still_propagated() {
        let status = review("approved", Some("needs_rework")).effective_status();
        assert_eq!(status, ReviewStatus::Other("needs_rework".to_string()));
    }
}
