//! Derived analytics: the batch rollup job and the reporting queries.
//!
//! Everything in this module is regenerable from the raw event store; the
//! rollup recomputes, reporting only reads.

pub mod reports;
pub mod rollup;

pub use reports::Reports;
pub use rollup::{run_rollup, RollupSummary};
