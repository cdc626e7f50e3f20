//! Core domain types for footfall
//!
//! These types model the two analytics collections and the business
//! reference data they are joined against.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Business** | A directory listing that events are attributed to |
//! | **Event** | One timestamped interaction (view, click subtype, or share) |
//! | **Actor** | The signed-in user behind an event; guests have no actor |
//! | **DailyMetric** | The per-day, per-business rollup row |
//! | **Bucket** | The counter an event lands in: view, click, or share |
//!
//! Click subtypes (website, call, email, whatsapp, instagram) are kept
//! distinct in the event store so the raw data stays lossless, but they all
//! roll up into the single `clicks` counter.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Event types
// ============================================

/// Interaction types accepted by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    View,
    Share,
    ClickWebsite,
    ClickCall,
    ClickEmail,
    ClickWhatsapp,
    ClickInstagram,
}

impl EventType {
    /// Returns the identifier used in database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::View => "view",
            EventType::Share => "share",
            EventType::ClickWebsite => "click_website",
            EventType::ClickCall => "click_call",
            EventType::ClickEmail => "click_email",
            EventType::ClickWhatsapp => "click_whatsapp",
            EventType::ClickInstagram => "click_instagram",
        }
    }

    /// The counter this event rolls up into.
    ///
    /// Only `view` and `share` have dedicated counters; every other type,
    /// including click subtypes added after this enum was written, counts
    /// as a generic click.
    pub fn bucket(&self) -> Bucket {
        match self {
            EventType::View => Bucket::View,
            EventType::Share => Bucket::Share,
            _ => Bucket::Click,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(EventType::View),
            "share" => Ok(EventType::Share),
            "click_website" => Ok(EventType::ClickWebsite),
            "click_call" => Ok(EventType::ClickCall),
            "click_email" => Ok(EventType::ClickEmail),
            "click_whatsapp" => Ok(EventType::ClickWhatsapp),
            "click_instagram" => Ok(EventType::ClickInstagram),
            _ => Err(format!("unknown event type: {}", s)),
        }
    }
}

/// The three counters a [`DailyMetric`] row carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    View,
    Click,
    Share,
}

// ============================================
// Events
// ============================================

/// A raw interaction event as submitted by a caller.
///
/// The tracker assigns `id` and `ts`; callers never pick them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSubmission {
    /// Business the interaction is attributed to
    pub business_id: String,
    /// What kind of interaction this is
    pub event_type: EventType,
    /// Acting user, absent for guests
    pub actor_id: Option<String>,
}

/// A stored interaction event.
///
/// Events are append-only: never mutated, never deleted individually. The
/// only deletion is bulk compaction by age after a rollup run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier (UUID v4), assigned at creation
    pub id: String,
    /// Business the interaction is attributed to
    pub business_id: String,
    /// What kind of interaction this is
    pub event_type: EventType,
    /// Instant of occurrence (UTC, millisecond precision), assigned at creation
    pub ts: DateTime<Utc>,
    /// Acting user, absent for guests
    pub actor_id: Option<String>,
}

impl Event {
    /// The UTC calendar day this event falls on.
    pub fn day(&self) -> NaiveDate {
        self.ts.date_naive()
    }
}

// ============================================
// Daily metrics
// ============================================

/// One rollup row per `(date, business)` pair.
///
/// Counters are exact event counts for the day once the rollup has run.
/// Between rollups the write-through path keeps `views`/`clicks`/`shares`
/// current but leaves `unique_visitors` stale past row creation; only the
/// rollup computes that field exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyMetric {
    /// UTC calendar day (stored as `YYYY-MM-DD`)
    pub date: NaiveDate,
    /// Business this row summarizes
    pub business_id: String,
    /// Count of view events
    pub views: i64,
    /// Count of click events (all subtypes)
    pub clicks: i64,
    /// Count of share events
    pub shares: i64,
    /// Distinct non-empty actor ids seen this day
    pub unique_visitors: i64,
}

impl DailyMetric {
    /// An all-zero row, used when reporting synthesizes days with no data.
    pub fn zeroed(date: NaiveDate, business_id: &str) -> Self {
        Self {
            date,
            business_id: business_id.to_string(),
            views: 0,
            clicks: 0,
            shares: 0,
            unique_visitors: 0,
        }
    }
}

/// Lifetime totals for one business, summed across all rollup rows.
///
/// `unique_visitors` is deliberately absent: it is a per-day cardinality and
/// does not add up across days.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LifetimeStats {
    pub views: i64,
    pub clicks: i64,
    pub shares: i64,
}

/// One day of the directory-wide series: views and clicks summed over all
/// businesses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalDay {
    pub date: NaiveDate,
    pub views: i64,
    pub clicks: i64,
}

// ============================================
// Business reference data
// ============================================

/// A directory listing.
///
/// Maintained by the directory CRUD layer; the analytics engine only reads
/// it for the category distribution report (and upserts it in tests).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Directory category (e.g. "restaurant", "salon")
    pub category: String,
    /// When the listing was created
    pub created_at: DateTime<Utc>,
    /// Extensible metadata
    pub metadata: serde_json::Value,
}

// ============================================
// Access control
// ============================================

/// Caller access level for reporting queries.
///
/// Authentication itself lives outside this crate; callers hand the engine
/// the level their session resolved to, and admin-only queries reject
/// anything below [`AccessLevel::Admin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    /// Business owner or regular member
    Member,
    /// Platform administrator
    Admin,
}
