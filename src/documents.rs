//! Document pass: mirror metrics-store documents into the review store.
//!
//! New documents are inserted as full rows. Documents already present in the
//! review store get every ingestion-owned field overwritten with the metrics
//! values, `updated_at` included; `review_status` is left alone because the
//! review side owns it. Review-only documents are never touched.
//!
//! A row that differs only in `updated_at` is still rewritten, but is not
//! counted as refreshed.

use sqlx::SqliteConnection;
use std::collections::HashMap;

use crate::error::{Result, SyncError};
use crate::models::Document;
use crate::sync::SyncReport;

const SELECT_DOCUMENTS: &str = r#"
    SELECT id, filename, status, ocr_confidence, json_confidence,
           correction_count, flagged_for_review, review_status,
           created_at, updated_at
    FROM documents
    WHERE id IS NOT NULL
"#;

pub(crate) async fn load_documents(conn: &mut SqliteConnection) -> sqlx::Result<Vec<Document>> {
    sqlx::query_as::<_, Document>(SELECT_DOCUMENTS)
        .fetch_all(conn)
        .await
}

/// Run the document pass, counting into `report` as rows are written.
pub async fn sync_documents(
    metrics: &mut SqliteConnection,
    review: &mut SqliteConnection,
    report: &mut SyncReport,
) -> Result<()> {
    let metrics_docs = load_documents(metrics).await.map_err(SyncError::metrics)?;

    let existing: HashMap<String, Document> = load_documents(&mut *review)
        .await
        .map_err(SyncError::review)?
        .into_iter()
        .map(|doc| (doc.id.clone(), doc))
        .collect();

    for doc in &metrics_docs {
        match existing.get(&doc.id) {
            None => {
                insert_document(&mut *review, doc)
                    .await
                    .map_err(SyncError::review)?;
                report.documents_inserted += 1;
            }
            Some(current) => {
                let changed = !current.ingestion_fields_eq(doc);
                if changed || current.updated_at != doc.updated_at {
                    refresh_document(&mut *review, doc)
                        .await
                        .map_err(SyncError::review)?;
                }
                if changed {
                    report.documents_refreshed += 1;
                }
            }
        }
    }

    Ok(())
}

async fn insert_document(conn: &mut SqliteConnection, doc: &Document) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO documents (
            id, filename, status, ocr_confidence, json_confidence,
            correction_count, flagged_for_review, review_status,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&doc.id)
    .bind(&doc.filename)
    .bind(&doc.status)
    .bind(doc.ocr_confidence)
    .bind(doc.json_confidence)
    .bind(doc.correction_count)
    .bind(doc.flagged_for_review)
    .bind(&doc.review_status)
    .bind(&doc.created_at)
    .bind(&doc.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

async fn refresh_document(conn: &mut SqliteConnection, doc: &Document) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE documents SET
            filename = ?,
            status = ?,
            ocr_confidence = ?,
            json_confidence = ?,
            correction_count = ?,
            flagged_for_review = ?,
            created_at = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&doc.filename)
    .bind(&doc.status)
    .bind(doc.ocr_confidence)
    .bind(doc.json_confidence)
    .bind(doc.correction_count)
    .bind(doc.flagged_for_review)
    .bind(&doc.created_at)
    .bind(&doc.updated_at)
    .bind(&doc.id)
    .execute(conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_store, Store};
    use crate::schema::create_metrics_schema;
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    async fn store(tmp: &TempDir, name: &str) -> SqlitePool {
        let pool = create_store(Store::Metrics, &tmp.path().join(name))
            .await
            .unwrap();
        create_metrics_schema(&pool).await.unwrap();
        pool
    }

    fn doc(id: &str, review_status: &str) -> Document {
        Document {
            id: id.to_string(),
            filename: Some(format!("{}.pdf", id)),
            status: Some("done".to_string()),
            ocr_confidence: Some(0.91),
            json_confidence: Some(0.75),
            correction_count: Some(0),
            flagged_for_review: Some(0),
            review_status: Some(review_status.to_string()),
            created_at: Some("2024-01-01T10:00:00".to_string()),
            updated_at: Some("2024-01-01T10:00:00".to_string()),
        }
    }

    #[tokio::test]
    async fn test_refresh_keeps_review_status() {
        let tmp = TempDir::new().unwrap();
        let metrics = store(&tmp, "m.db").await;
        let review = store(&tmp, "r.db").await;

        let mut m = metrics.acquire().await.unwrap();
        let mut r = review.acquire().await.unwrap();

        insert_document(&mut r, &doc("doc1", "approved")).await.unwrap();
        let mut updated = doc("doc1", "pending");
        updated.status = Some("validated".to_string());
        updated.correction_count = Some(2);
        updated.updated_at = Some("2024-02-01T09:00:00".to_string());
        insert_document(&mut m, &updated).await.unwrap();

        let mut report = SyncReport::default();
        sync_documents(&mut m, &mut r, &mut report).await.unwrap();
        assert_eq!(report.documents_inserted, 0);
        assert_eq!(report.documents_refreshed, 1);

        let rows = load_documents(&mut r).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status.as_deref(), Some("validated"));
        assert_eq!(rows[0].correction_count, Some(2));
        assert_eq!(rows[0].updated_at.as_deref(), Some("2024-02-01T09:00:00"));
        assert_eq!(rows[0].review_status.as_deref(), Some("approved"));
    }

    #[tokio::test]
    async fn test_timestamp_only_change_is_mirrored_but_not_counted() {
        let tmp = TempDir::new().unwrap();
        let metrics = store(&tmp, "m.db").await;
        let review = store(&tmp, "r.db").await;

        let mut m = metrics.acquire().await.unwrap();
        let mut r = review.acquire().await.unwrap();

        insert_document(&mut r, &doc("doc1", "approved")).await.unwrap();
        let mut bumped = doc("doc1", "approved");
        bumped.updated_at = Some("2024-06-01T00:00:00".to_string());
        insert_document(&mut m, &bumped).await.unwrap();

        let mut report = SyncReport::default();
        sync_documents(&mut m, &mut r, &mut report).await.unwrap();
        assert_eq!(report.documents_refreshed, 0);

        let rows = load_documents(&mut r).await.unwrap();
        assert_eq!(rows[0].updated_at.as_deref(), Some("2024-06-01T00:00:00"));
    }

    #[tokio::test]
    async fn test_review_only_documents_untouched() {
        let tmp = TempDir::new().unwrap();
        let metrics = store(&tmp, "m.db").await;
        let review = store(&tmp, "r.db").await;

        let mut m = metrics.acquire().await.unwrap();
        let mut r = review.acquire().await.unwrap();

        insert_document(&mut r, &doc("doc3", "approved")).await.unwrap();
        insert_document(&mut m, &doc("doc1", "pending")).await.unwrap();

        let mut report = SyncReport::default();
        sync_documents(&mut m, &mut r, &mut report).await.unwrap();
        assert_eq!(report.documents_inserted, 1);

        let mut ids: Vec<String> = load_documents(&mut r)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["doc1", "doc3"]);
    }
}
