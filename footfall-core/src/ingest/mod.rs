//! Ingestion layer for interaction events
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌────────────────┐
//! │ UI handlers  │ ──► │   Tracker    │ ──► │  events table  │
//! │ (out of      │     │              │     └────────────────┘
//! │  scope)      │     │ write-through│ ──► ┌────────────────┐
//! └──────────────┘     └──────────────┘     │ daily_metrics  │
//!                                           └────────────────┘
//! ```
//!
//! The tracker appends the raw event and then bumps today's rollup row so
//! real-time dashboards see counters move before the next batch run. The
//! bump is best-effort arithmetic; the rollup job's full recomputation
//! supersedes it on the next tick.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use footfall_core::{Database, Tracker};
//! use footfall_core::types::{EventSubmission, EventType};
//!
//! let tracker = Tracker::new(db);
//! let event = tracker.track(EventSubmission {
//!     business_id: "biz-42".to_string(),
//!     event_type: EventType::View,
//!     actor_id: Some("user-7".to_string()),
//! })?;
//! ```

use crate::db::Database;
use crate::error::Result;
use crate::types::{Event, EventSubmission};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Records interaction events and keeps today's rollup row warm.
pub struct Tracker {
    db: Arc<Database>,
}

impl Tracker {
    /// Create a tracker over the shared database handle.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Record one interaction.
    ///
    /// Assigns the event id and timestamp, appends to the event store, then
    /// upserts today's `(date, business)` rollup row. A business that has
    /// never been seen before simply gets a fresh row; that is not an error.
    ///
    /// `unique_visitors` on the bumped row is only seeded at row creation
    /// and goes stale as more actors arrive during the day. The rollup job
    /// recomputes it exactly on its next run.
    pub fn track(&self, submission: EventSubmission) -> Result<Event> {
        let event = Event {
            id: Uuid::new_v4().to_string(),
            business_id: submission.business_id,
            event_type: submission.event_type,
            ts: Utc::now(),
            // Empty actor ids are guest traffic as far as cardinality goes
            actor_id: submission.actor_id.filter(|a| !a.is_empty()),
        };

        self.db.insert_event(&event)?;
        self.db.bump_daily_metric(
            event.day(),
            &event.business_id,
            event.event_type.bucket(),
            event.actor_id.is_some(),
        )?;

        tracing::debug!(
            event_id = %event.id,
            business_id = %event.business_id,
            event_type = %event.event_type,
            "Tracked event"
        );

        Ok(event)
    }
}
