//! Cross-store reconciliation between the metrics and review stores.
//!
//! A run opens both stores and executes three passes in fixed order:
//!
//! ```text
//!   metrics ──documents──▶ review     (insert new, refresh ingestion fields)
//!   metrics ──issues─────▶ review     (insert unseen (doc, type, details) keys)
//!   metrics ◀─review status── review  (terminal verdicts, feedback first)
//! ```
//!
//! The review store is written inside one transaction covering the first
//! two passes (and read by the third, so freshly inserted documents are
//! eligible). The metrics store is written inside its own transaction in the
//! third pass. The review transaction commits first; a failure between the
//! two commits leaves the metrics side behind until the next run, which
//! converges both stores again since every pass is idempotent.
//!
//! The engine never deletes rows and takes no lock of its own; callers must
//! not run two syncs over the same stores at once.

use chrono::Utc;
use sqlx::{Connection, SqlitePool};
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::db::{self, Store, StorePaths};
use crate::documents;
use crate::error::SyncError;
use crate::events::{SyncEvent, SyncLog};
use crate::issues;
use crate::status;

/// Counts produced by a sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Documents newly inserted into the review store.
    pub documents_inserted: u64,
    /// Existing review documents whose ingestion-owned fields changed.
    pub documents_refreshed: u64,
    /// Issues newly inserted into the review store.
    pub issues_inserted: u64,
    /// Metrics documents whose `review_status` was overwritten.
    pub statuses_propagated: u64,
}

impl SyncReport {
    /// `(documents synced, issues synced)`.
    pub fn counts(&self) -> (u64, u64) {
        (self.documents_inserted, self.issues_inserted)
    }
}

/// Which stores were missing when a run was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absence {
    Metrics,
    Review,
    Both,
}

impl Absence {
    fn of(metrics_present: bool, review_present: bool) -> Option<Self> {
        match (metrics_present, review_present) {
            (true, true) => None,
            (false, true) => Some(Absence::Metrics),
            (true, false) => Some(Absence::Review),
            (false, false) => Some(Absence::Both),
        }
    }
}

impl fmt::Display for Absence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Absence::Metrics => write!(f, "{} store absent", Store::Metrics),
            Absence::Review => write!(f, "{} store absent", Store::Review),
            Absence::Both => f.write_str("metrics and review stores absent"),
        }
    }
}

/// Point in a run at which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Open,
    Documents,
    Issues,
    ReviewStatus,
    CommitReview,
    CommitMetrics,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Open => "open",
            Stage::Documents => "documents",
            Stage::Issues => "issues",
            Stage::ReviewStatus => "review status",
            Stage::CommitReview => "review commit",
            Stage::CommitMetrics => "metrics commit",
        };
        f.write_str(name)
    }
}

/// Result of a run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Both stores were present and every pass committed.
    Synced(SyncReport),
    /// At least one store was absent; nothing was read, written, or created.
    Skipped(Absence),
}

impl SyncOutcome {
    /// `(documents synced, issues synced)`; `(0, 0)` when skipped.
    pub fn counts(&self) -> (u64, u64) {
        match self {
            SyncOutcome::Synced(report) => report.counts(),
            SyncOutcome::Skipped(_) => (0, 0),
        }
    }

    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            SyncOutcome::Synced(report) => Some(report),
            SyncOutcome::Skipped(_) => None,
        }
    }
}

/// A run that failed part-way.
///
/// `progress` holds the counts reached before the failure. Those writes are
/// durable only for the review store and only if `review_committed` is set;
/// otherwise the transactions were rolled back.
#[derive(Error, Debug)]
#[error("sync failed during {stage}: {source}")]
pub struct SyncFailure {
    pub stage: Stage,
    pub progress: SyncReport,
    pub review_committed: bool,
    #[source]
    pub source: SyncError,
}

impl SyncFailure {
    /// The `(documents synced, issues synced)` pair reported for a failed run.
    pub fn counts(&self) -> (u64, u64) {
        (0, 0)
    }

    /// Whether the failure was lock contention rather than a fault in the stores.
    pub fn is_busy(&self) -> bool {
        self.source.is_busy()
    }
}

/// Reconcile the stores at `paths`.
///
/// Fails at [`Stage::Open`] without touching either file when both paths
/// name the same database.
pub async fn sync_stores(
    paths: &StorePaths,
    log: &dyn SyncLog,
) -> Result<SyncOutcome, SyncFailure> {
    let mut report = SyncReport::default();

    if paths.same_file() {
        let source = SyncError::SameStore {
            path: paths.metrics.clone(),
        };
        return Err(fail(log, Stage::Open, report, false, source));
    }

    let metrics = match db::open_existing(Store::Metrics, &paths.metrics).await {
        Ok(pool) => pool,
        Err(source) => return Err(fail(log, Stage::Open, report, false, source)),
    };
    let review = match db::open_existing(Store::Review, &paths.review).await {
        Ok(pool) => pool,
        Err(source) => {
            if let Some(pool) = metrics {
                pool.close().await;
            }
            return Err(fail(log, Stage::Open, report, false, source));
        }
    };

    let (metrics, review) = match (metrics, review) {
        (Some(metrics), Some(review)) => (metrics, review),
        (metrics, review) => {
            let absence = Absence::of(metrics.is_some(), review.is_some());
            for pool in [metrics, review].into_iter().flatten() {
                pool.close().await;
            }
            let absence = absence.unwrap_or(Absence::Both);
            log.record(SyncEvent::Skipped { absence, paths });
            return Ok(SyncOutcome::Skipped(absence));
        }
    };

    let synced_at = Utc::now().to_rfc3339();
    let result = run_passes(&metrics, &review, &synced_at, log, &mut report).await;

    metrics.close().await;
    review.close().await;

    match result {
        Ok(()) => {
            log.record(SyncEvent::Completed(&report));
            Ok(SyncOutcome::Synced(report))
        }
        Err(err) => Err(fail(log, err.stage, report, err.review_committed, err.source)),
    }
}

/// Reconcile the stores under `project_root`, with optional explicit paths.
///
/// A missing path falls back to the default layout (`data/metrics.db`,
/// `review/review.db`).
pub async fn sync_databases(
    project_root: &Path,
    metrics_path: Option<&Path>,
    review_path: Option<&Path>,
    log: &dyn SyncLog,
) -> Result<SyncOutcome, SyncFailure> {
    let mut paths = StorePaths::for_project(project_root);
    if let Some(path) = metrics_path {
        paths.metrics = path.to_path_buf();
    }
    if let Some(path) = review_path {
        paths.review = path.to_path_buf();
    }
    sync_stores(&paths, log).await
}

struct PassError {
    stage: Stage,
    review_committed: bool,
    source: SyncError,
}

fn at(stage: Stage) -> impl FnOnce(SyncError) -> PassError {
    move |source| PassError {
        stage,
        review_committed: false,
        source,
    }
}

async fn run_passes(
    metrics: &SqlitePool,
    review: &SqlitePool,
    synced_at: &str,
    log: &dyn SyncLog,
    report: &mut SyncReport,
) -> Result<(), PassError> {
    let mut metrics_conn = metrics
        .acquire()
        .await
        .map_err(SyncError::metrics)
        .map_err(at(Stage::Open))?;
    let mut review_tx = review
        .begin()
        .await
        .map_err(SyncError::review)
        .map_err(at(Stage::Open))?;

    documents::sync_documents(&mut metrics_conn, &mut review_tx, report)
        .await
        .map_err(at(Stage::Documents))?;
    log.record(SyncEvent::PassFinished {
        stage: Stage::Documents,
        report: &*report,
    });

    issues::sync_issues(&mut metrics_conn, &mut review_tx, report)
        .await
        .map_err(at(Stage::Issues))?;
    log.record(SyncEvent::PassFinished {
        stage: Stage::Issues,
        report: &*report,
    });

    let mut metrics_tx = Connection::begin(&mut *metrics_conn)
        .await
        .map_err(SyncError::metrics)
        .map_err(at(Stage::ReviewStatus))?;
    status::propagate_review_status(&mut review_tx, &mut metrics_tx, synced_at, report)
        .await
        .map_err(at(Stage::ReviewStatus))?;
    log.record(SyncEvent::PassFinished {
        stage: Stage::ReviewStatus,
        report: &*report,
    });

    review_tx.commit().await.map_err(|source| PassError {
        stage: Stage::CommitReview,
        review_committed: false,
        source: SyncError::Commit {
            store: Store::Review,
            source,
        },
    })?;
    metrics_tx.commit().await.map_err(|source| PassError {
        stage: Stage::CommitMetrics,
        review_committed: true,
        source: SyncError::Commit {
            store: Store::Metrics,
            source,
        },
    })?;

    Ok(())
}

fn fail(
    log: &dyn SyncLog,
    stage: Stage,
    progress: SyncReport,
    review_committed: bool,
    source: SyncError,
) -> SyncFailure {
    let failure = SyncFailure {
        stage,
        progress,
        review_committed,
        source,
    };
    log.record(SyncEvent::Failed(&failure));
    failure
}
