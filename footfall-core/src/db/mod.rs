//! Database layer for footfall
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Repository pattern for queries
//! - Composite-key upserts for the daily rollup table

pub mod repo;
pub mod schema;

pub use repo::{Database, StoreStats};
