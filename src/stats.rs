//! Store statistics.
//!
//! Gives a quick summary of both stores: document and issue counts, how many
//! flagged documents are still waiting for a human, and how verdicts are
//! distributed. Used by `review-sync stats` to check that syncs are doing what
//! they should.

use anyhow::Result;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::db::{self, Store, StorePaths};

/// Summary of a single store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreStats {
    pub store: Store,
    pub documents: i64,
    pub issues: i64,
    /// Flagged documents whose `review_status` is still `pending` or unset.
    pub awaiting_review: i64,
    /// `(review_status, count)`, most common first. Unset is shown as `(none)`.
    pub by_review_status: Vec<(String, i64)>,
    /// Review store only.
    pub feedback: Option<i64>,
}

pub async fn collect_store_stats(pool: &SqlitePool, store: Store) -> Result<StoreStats> {
    let documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(pool)
        .await?;

    let issues: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document_issues")
        .fetch_one(pool)
        .await?;

    let awaiting_review: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM documents
        WHERE flagged_for_review = 1
          AND (review_status IS NULL OR review_status = 'pending')
        "#,
    )
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query(
        r#"
        SELECT COALESCE(review_status, '(none)') AS review_status, COUNT(*) AS n
        FROM documents
        GROUP BY 1
        ORDER BY n DESC, review_status ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let by_review_status = rows
        .iter()
        .map(|row| (row.get::<String, _>("review_status"), row.get::<i64, _>("n")))
        .collect();

    let feedback = match store {
        Store::Review => Some(
            sqlx::query_scalar("SELECT COUNT(*) FROM review_feedback")
                .fetch_one(pool)
                .await?,
        ),
        Store::Metrics => None,
    };

    Ok(StoreStats {
        store,
        documents,
        issues,
        awaiting_review,
        by_review_status,
        feedback,
    })
}

/// Run the stats command: query both stores and print a summary.
pub async fn run_stats(paths: &StorePaths) -> Result<()> {
    println!("Review Sync — Store Stats");
    println!("=========================");

    for store in [Store::Metrics, Store::Review] {
        let path = paths.get(store);
        println!();
        println!("  {} store: {}", store, path.display());

        let Some(pool) = db::open_existing(store, path).await? else {
            println!("    absent");
            continue;
        };

        let stats = collect_store_stats(&pool, store).await;
        pool.close().await;
        let stats = stats?;

        println!("    Size:            {}", format_bytes(file_size(path)));
        println!("    Documents:       {}", stats.documents);
        println!("    Issues:          {}", stats.issues);
        println!("    Awaiting review: {}", stats.awaiting_review);
        if let Some(feedback) = stats.feedback {
            println!("    Feedback rows:   {}", feedback);
        }

        if !stats.by_review_status.is_empty() {
            println!();
            println!("    {:<20} {:>8}", "REVIEW STATUS", "DOCS");
            println!("    {}", "-".repeat(29));
            for (status, count) in &stats.by_review_status {
                println!("    {:<20} {:>8}", status, count);
            }
        }
    }

    println!();
    Ok(())
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
