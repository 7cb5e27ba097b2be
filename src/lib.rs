//! # Review Sync
//!
//! Reconciles the two stores that describe the same documents: the metrics
//! store written by the ingestion pipeline and the review store written by
//! the human-review interface.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  documents, issues   ┌──────────────┐
//! │ metrics.db   │ ───────────────────▶ │  review.db   │
//! │ (ingestion)  │ ◀─────────────────── │  (humans)    │
//! └──────────────┘   review verdicts    └──────────────┘
//! ```
//!
//! The ingestion side owns every document field except `review_status` and
//! owns all issues. The review side owns feedback and finalizes
//! `review_status`. A sync run is a single batch: three passes, one
//! transaction per store, no deletions.
//!
//! ## Quick Start
//!
//! ```bash
//! review-sync init     # create empty stores with the expected tables
//! review-sync sync     # reconcile data/metrics.db with review/review.db
//! review-sync stats    # show counts for both stores
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Store locations and connections |
//! | [`schema`] | Table layout bootstrap |
//! | [`models`] | Document, issue, and review status types |
//! | [`documents`] | Document pass |
//! | [`issues`] | Issue pass |
//! | [`status`] | Review-status back-propagation pass |
//! | [`sync`] | Orchestration and run results |
//! | [`events`] | Log capability used by the orchestrator |
//! | [`stats`] | Store statistics |
//! | [`error`] | Error types |

pub mod config;
pub mod db;
pub mod documents;
pub mod error;
pub mod events;
pub mod issues;
pub mod models;
pub mod schema;
pub mod stats;
pub mod status;
pub mod sync;

pub use events::{RecordingLog, SyncLog, TracingLog};
pub use sync::{sync_databases, sync_stores, SyncFailure, SyncOutcome, SyncReport};
