//! Log capability handed to the sync orchestrator.
//!
//! The orchestrator never logs through a global; callers pass a [`SyncLog`].
//! [`TracingLog`] forwards to `tracing`, [`RecordingLog`] keeps rendered lines
//! in memory for tests and embedding callers.

use std::fmt;
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::db::StorePaths;
use crate::sync::{Absence, Stage, SyncFailure, SyncReport};

/// Something worth reporting during a sync run.
#[derive(Debug, Clone, Copy)]
pub enum SyncEvent<'a> {
    /// A pass completed; `report` holds the running totals.
    PassFinished {
        stage: Stage,
        report: &'a SyncReport,
    },
    Completed(&'a SyncReport),
    Skipped {
        absence: Absence,
        paths: &'a StorePaths,
    },
    Failed(&'a SyncFailure),
}

impl fmt::Display for SyncEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncEvent::PassFinished { stage, report } => write!(
                f,
                "{} pass finished: {} inserted, {} refreshed, {} issues, {} statuses",
                stage,
                report.documents_inserted,
                report.documents_refreshed,
                report.issues_inserted,
                report.statuses_propagated
            ),
            SyncEvent::Completed(report) => write!(
                f,
                "sync complete: synced {} documents and {} issues",
                report.documents_inserted, report.issues_inserted
            ),
            SyncEvent::Skipped { absence, .. } => write!(f, "sync skipped: {}", absence),
            SyncEvent::Failed(failure) => write!(f, "sync failed: {}", failure),
        }
    }
}

/// Receives sync events.
pub trait SyncLog: Send + Sync {
    fn record(&self, event: SyncEvent<'_>);
}

/// Forwards events to `tracing` with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl SyncLog for TracingLog {
    fn record(&self, event: SyncEvent<'_>) {
        match event {
            SyncEvent::PassFinished { stage, report } => debug!(
                %stage,
                documents = report.documents_inserted,
                refreshed = report.documents_refreshed,
                issues = report.issues_inserted,
                statuses = report.statuses_propagated,
                "pass finished"
            ),
            SyncEvent::Completed(report) => info!(
                documents = report.documents_inserted,
                refreshed = report.documents_refreshed,
                issues = report.issues_inserted,
                statuses = report.statuses_propagated,
                "{}",
                event
            ),
            SyncEvent::Skipped { absence, paths } => warn!(
                metrics = %paths.metrics.display(),
                review = %paths.review.display(),
                "sync skipped: {}",
                absence
            ),
            SyncEvent::Failed(failure) => error!(
                stage = %failure.stage,
                review_committed = failure.review_committed,
                busy = failure.is_busy(),
                documents = failure.progress.documents_inserted,
                issues = failure.progress.issues_inserted,
                error = %failure.source,
                "sync failed"
            ),
        }
    }
}

/// Keeps every event as its rendered line.
#[derive(Debug, Default)]
pub struct RecordingLog {
    lines: Mutex<Vec<String>>,
}

impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl SyncLog for RecordingLog {
    fn record(&self, event: SyncEvent<'_>) {
        let line = event.to_string();
        match self.lines.lock() {
            Ok(mut lines) => lines.push(line),
            Err(poisoned) => poisoned.into_inner().push(line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_completed_line() {
        let report = SyncReport {
            documents_inserted: 2,
            documents_refreshed: 1,
            issues_inserted: 3,
            statuses_propagated: 0,
        };
        assert_eq!(
            SyncEvent::Completed(&report).to_string(),
            "sync complete: synced 2 documents and 3 issues"
        );
    }

    #[test]
    fn test_recording_log_keeps_order() {
        let log = RecordingLog::new();
        let paths = StorePaths::for_project(Path::new("/tmp/project"));
        let report = SyncReport::default();

        log.record(SyncEvent::Skipped {
            absence: Absence::Review,
            paths: &paths,
        });
        log.record(SyncEvent::Completed(&report));

        assert_eq!(
            log.lines(),
            vec![
                "sync skipped: review store absent".to_string(),
                "sync complete: synced 0 documents and 0 issues".to_string(),
            ]
        );
    }
}
