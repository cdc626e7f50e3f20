//! # footfall-core
//!
//! Core library for footfall - the interaction analytics engine behind a
//! business directory.
//!
//! This library provides:
//! - An append-only event store for raw interactions (views, clicks, shares)
//! - A write-through ingestion path so dashboards see counters move live
//! - A batch rollup job that recomputes per-day, per-business metrics and
//!   compacts old raw events
//! - Reporting queries over the rollup table
//!
//! ## Architecture
//!
//! ```text
//! Tracker ──► events ──(rollup)──► daily_metrics ──► Reports
//!    └─────── write-through ──────────┘
//! ```
//!
//! The write-through path is speculative: the rollup's full recomputation
//! is the authority and corrects any drift on its next run.
//!
//! ## Example
//!
//! ```rust,no_run
//! use footfall_core::{Config, Database};
//!
//! let config = Config::load().expect("failed to load config");
//!
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{run_rollup, Reports, RollupSummary};
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use ingest::Tracker;
pub use scheduler::Scheduler;
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod scheduler;
pub mod types;
