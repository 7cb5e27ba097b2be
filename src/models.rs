//! Core data models shared by both stores.
//!
//! Both the metrics store and the review store use the same `documents` and
//! `document_issues` layout. Rows are read into named-field structs so that
//! inserts bind columns by name rather than by tuple position.

use std::fmt;

/// A processed document as stored in either store.
///
/// Every column is nullable in the underlying schema, so every attribute
/// other than `id` is optional and round-trips unchanged.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Document {
    pub id: String,
    pub filename: Option<String>,
    pub status: Option<String>,
    pub ocr_confidence: Option<f64>,
    pub json_confidence: Option<f64>,
    pub correction_count: Option<i64>,
    pub flagged_for_review: Option<i64>,
    pub review_status: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Document {
    /// Compares the fields the ingestion pipeline owns. `review_status` is
    /// owned by the review side. `updated_at` is left out because the status
    /// pass stamps it on the metrics side every run; the document pass still
    /// mirrors it but does not count it as a refresh.
    pub fn ingestion_fields_eq(&self, other: &Document) -> bool {
        self.id == other.id
            && self.filename == other.filename
            && self.status == other.status
            && self.ocr_confidence == other.ocr_confidence
            && self.json_confidence == other.json_confidence
            && self.correction_count == other.correction_count
            && self.flagged_for_review == other.flagged_for_review
            && self.created_at == other.created_at
    }
}

/// A detected problem attached to a document. Issues are append-only.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Issue {
    pub document_id: Option<String>,
    pub issue_type: Option<String>,
    pub issue_details: Option<String>,
    pub created_at: Option<String>,
}

/// Content identity of an issue: `(document_id, issue_type, issue_details)`.
///
/// Issues carry no sync-stable primary key, so two rows with the same key
/// are the same fact regardless of `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IssueKey {
    pub document_id: Option<String>,
    pub issue_type: Option<String>,
    pub issue_details: Option<String>,
}

impl Issue {
    pub fn key(&self) -> IssueKey {
        IssueKey {
            document_id: self.document_id.clone(),
            issue_type: self.issue_type.clone(),
            issue_details: self.issue_details.clone(),
        }
    }
}

/// Human review verdict for a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    Other(String),
}

impl ReviewStatus {
    /// Statuses that represent a finished human decision and are copied
    /// back to the metrics store.
    pub const TERMINAL: [ReviewStatus; 3] = [
        ReviewStatus::Approved,
        ReviewStatus::Rejected,
        ReviewStatus::Completed,
    ];

    pub fn parse(value: &str) -> Self {
        match value {
            "pending" => ReviewStatus::Pending,
            "approved" => ReviewStatus::Approved,
            "rejected" => ReviewStatus::Rejected,
            "completed" => ReviewStatus::Completed,
            other => ReviewStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
            ReviewStatus::Completed => "completed",
            ReviewStatus::Other(s) => s,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReviewStatus::Approved | ReviewStatus::Rejected | ReviewStatus::Completed
        )
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
