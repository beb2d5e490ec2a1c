//! Time entry model
//!
//! Table: time_entries
//!
//! An entry is one interval of work by one person on one project. An entry
//! without an end instant is open; an open entry with a pause instant is
//! paused and does not accrue time until it is unpaused.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tp_core::traits::{Entity, Id, Identifiable};
use validator::Validate;

const SECONDS_PER_HOUR: i64 = 3600;

/// Time entry entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TimeEntry {
    pub id: Option<Id>,

    /// User account the time belongs to
    pub user_id: Id,

    pub project_id: Id,

    /// Kind of work (development, QA, ...)
    pub activity_id: Option<Id>,

    /// Where the work took place
    pub location_id: Id,

    pub start_time: DateTime<Utc>,

    /// Unset while the entry is open
    pub end_time: Option<DateTime<Utc>>,

    /// Seconds spent paused, excluded from the worked time
    #[validate(range(min = 0))]
    pub seconds_paused: i64,

    /// Set while the entry is paused
    pub pause_time: Option<DateTime<Utc>>,

    #[validate(length(max = 4000))]
    #[serde(default)]
    pub comments: String,

    /// Worked hours, derived from the timestamps on every save
    pub hours: Decimal,

    #[serde(default = "default_billable")]
    pub billable: bool,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_billable() -> bool {
    true
}

impl Identifiable for TimeEntry {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Entity for TimeEntry {
    const TABLE_NAME: &'static str = "time_entries";
    const TYPE_NAME: &'static str = "TimeEntry";
}

impl TimeEntry {
    /// Create a new open entry starting at `start_time`
    pub fn open(user_id: Id, project_id: Id, location_id: Id, start_time: DateTime<Utc>) -> Self {
        Self {
            id: None,
            user_id,
            project_id,
            activity_id: None,
            location_id,
            start_time,
            end_time: None,
            seconds_paused: 0,
            pause_time: None,
            comments: String::new(),
            hours: Decimal::ZERO,
            billable: true,
            created_at: None,
            updated_at: None,
        }
    }

    /// Seconds between start and end minus paused seconds, never negative.
    /// Open entries have no elapsed time yet.
    pub fn elapsed_seconds(&self) -> i64 {
        match self.end_time {
            Some(end) => ((end - self.start_time).num_seconds() - self.seconds_paused).max(0),
            None => 0,
        }
    }

    /// Elapsed time in hours, rounded to two places
    pub fn total_hours(&self) -> Decimal {
        (Decimal::from(self.elapsed_seconds()) / Decimal::from(SECONDS_PER_HOUR))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Recompute `hours` from the timestamps. Stores call this before every write.
    pub fn refresh_hours(&mut self) {
        self.hours = self.total_hours();
    }

    pub fn is_paused(&self) -> bool {
        self.pause_time.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn is_open(&self) -> bool {
        !self.is_closed()
    }

    /// Pause the entry at `at`. Returns false if it was already paused.
    pub fn pause(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_paused() {
            return false;
        }
        self.pause_time = Some(at);
        true
    }

    /// Resume a paused entry at `at`, adding the paused span to
    /// `seconds_paused`. Returns false if it was not paused.
    pub fn unpause(&mut self, at: DateTime<Utc>) -> bool {
        let Some(paused_at) = self.pause_time.take() else {
            return false;
        };
        self.seconds_paused += (at - paused_at).num_seconds().max(0);
        true
    }

    /// Close the entry at `at`, resuming it first if it is paused
    pub fn close(&mut self, at: DateTime<Utc>) {
        self.unpause(at);
        self.end_time = Some(at);
        self.refresh_hours();
    }

    /// Whether this entry shares time with `[start, end]`: its end falls in
    /// the range, its start falls in the range, or it encloses the range
    pub fn intersects(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        let in_range = |t: DateTime<Utc>| start <= t && t <= end;
        match self.end_time {
            Some(own_end) => {
                in_range(own_end)
                    || in_range(self.start_time)
                    || (self.start_time <= start && own_end >= end)
            }
            None => in_range(self.start_time),
        }
    }

    /// Overlap heuristic: the entries intersecting this one (this one
    /// included) overlap when their summed elapsed time exceeds the
    /// wall-clock span they cover. `None` for open entries.
    pub fn detect_overlap(&self, neighbours: &[TimeEntry]) -> Option<bool> {
        let end = self.end_time?;

        let mut set: Vec<&TimeEntry> = neighbours
            .iter()
            .filter(|e| e.user_id == self.user_id && e.intersects(self.start_time, end))
            .collect();
        let already_included = self.id.is_some() && set.iter().any(|e| e.id == self.id);
        if !already_included {
            set.push(self);
        }

        let total: i64 = set.iter().map(|e| e.elapsed_seconds()).sum();
        let earliest = set.iter().map(|e| e.start_time).min()?;
        let latest = set.iter().filter_map(|e| e.end_time).max()?;
        let span = (latest - earliest).num_seconds();

        Some(total > span)
    }
}

/// Input for recording an entry
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewTimeEntry {
    pub user_id: Id,
    pub project_id: Id,
    pub activity_id: Option<Id>,
    pub location_id: Id,
    /// Defaults to now
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub seconds_paused: i64,
    #[serde(default)]
    pub comments: String,
    #[serde(default = "default_billable")]
    pub billable: bool,
}

impl NewTimeEntry {
    pub fn new(user_id: Id, project_id: Id, location_id: Id) -> Self {
        Self {
            user_id,
            project_id,
            location_id,
            billable: true,
            ..Default::default()
        }
    }

    pub fn with_activity(mut self, activity_id: Id) -> Self {
        self.activity_id = Some(activity_id);
        self
    }

    pub fn starting(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self
    }

    pub fn ending(mut self, end: DateTime<Utc>) -> Self {
        self.end_time = Some(end);
        self
    }

    pub fn paused_for(mut self, seconds: i64) -> Self {
        self.seconds_paused = seconds;
        self
    }

    pub fn non_billable(mut self) -> Self {
        self.billable = false;
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }

    /// Build the entry, starting now when no start was given
    pub fn into_entry(self, now: DateTime<Utc>) -> TimeEntry {
        let mut entry = TimeEntry::open(
            self.user_id,
            self.project_id,
            self.location_id,
            self.start_time.unwrap_or(now),
        );
        entry.activity_id = self.activity_id;
        entry.end_time = self.end_time;
        entry.seconds_paused = self.seconds_paused;
        entry.comments = self.comments;
        entry.billable = self.billable;
        entry.refresh_hours();
        entry
    }
}
