//! Store errors and entry filters
//!
//! Shared by the in-memory and PostgreSQL stores.

use chrono::{DateTime, Utc};
use tp_core::error::{TpError, ValidationErrors};
use tp_core::traits::Id;
use tp_models::TimeEntry;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Id },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn not_found(entity: &'static str, id: Id) -> Self {
        Self::NotFound { entity, id }
    }

    /// Map a unique-constraint violation to `Conflict`
    pub fn from_insert(err: sqlx::Error, message: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Conflict(message.into()),
            _ => Self::Database(err),
        }
    }
}

impl From<StoreError> for TpError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => TpError::not_found(entity, id),
            StoreError::Database(e) => TpError::Database(e.to_string()),
            StoreError::Conflict(message) => TpError::Conflict { message },
            StoreError::Validation(message) => {
                let mut errors = ValidationErrors::new();
                errors.add_base(message);
                TpError::Validation(errors)
            }
        }
    }
}

/// Selection of time entries for sums and listings.
///
/// End bounds never match open entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryFilter {
    pub user_id: Option<Id>,
    pub project_id: Option<Id>,
    pub exclude_project_ids: Vec<Id>,
    pub billable: Option<bool>,
    /// `start_time >= x`
    pub started_on_or_after: Option<DateTime<Utc>>,
    /// `end_time < x`
    pub ended_before: Option<DateTime<Utc>>,
    /// `end_time > x`
    pub ended_after: Option<DateTime<Utc>>,
    /// `end_time <= x`
    pub ended_on_or_before: Option<DateTime<Utc>>,
}

impl EntryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: Id) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn project(mut self, project_id: Id) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn excluding_projects(mut self, project_ids: impl IntoIterator<Item = Id>) -> Self {
        self.exclude_project_ids.extend(project_ids);
        self
    }

    pub fn billable(mut self, billable: bool) -> Self {
        self.billable = Some(billable);
        self
    }

    pub fn started_on_or_after(mut self, at: DateTime<Utc>) -> Self {
        self.started_on_or_after = Some(at);
        self
    }

    pub fn ended_before(mut self, at: DateTime<Utc>) -> Self {
        self.ended_before = Some(at);
        self
    }

    pub fn ended_after(mut self, at: DateTime<Utc>) -> Self {
        self.ended_after = Some(at);
        self
    }

    pub fn ended_on_or_before(mut self, at: DateTime<Utc>) -> Self {
        self.ended_on_or_before = Some(at);
        self
    }

    fn has_end_bound(&self) -> bool {
        self.ended_before.is_some() || self.ended_after.is_some() || self.ended_on_or_before.is_some()
    }

    pub fn matches(&self, entry: &TimeEntry) -> bool {
        if self.user_id.is_some_and(|id| id != entry.user_id) {
            return false;
        }
        if self.project_id.is_some_and(|id| id != entry.project_id) {
            return false;
        }
        if self.exclude_project_ids.contains(&entry.project_id) {
            return false;
        }
        if self.billable.is_some_and(|b| b != entry.billable) {
            return false;
        }
        if self.started_on_or_after.is_some_and(|lo| entry.start_time < lo) {
            return false;
        }

        let Some(end) = entry.end_time else {
            return !self.has_end_bound();
        };
        if self.ended_before.is_some_and(|hi| end >= hi) {
            return false;
        }
        if self.ended_after.is_some_and(|lo| end <= lo) {
            return false;
        }
        if self.ended_on_or_before.is_some_and(|hi| end > hi) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, h, 0, 0).unwrap()
    }

    fn entry(project: Id, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> TimeEntry {
        let mut e = TimeEntry::open(1, project, 1, start);
        e.end_time = end;
        e
    }

    #[test]
    fn test_filter_bounds() {
        let e = entry(4, at(13, 9), Some(at(13, 17)));

        assert!(EntryFilter::for_user(1).matches(&e));
        assert!(!EntryFilter::for_user(2).matches(&e));
        assert!(EntryFilter::new().ended_before(at(14, 0)).matches(&e));
        assert!(!EntryFilter::new().ended_before(at(13, 17)).matches(&e));
        assert!(EntryFilter::new().ended_on_or_before(at(13, 17)).matches(&e));
        assert!(!EntryFilter::new().ended_after(at(13, 17)).matches(&e));
        assert!(!EntryFilter::new().started_on_or_after(at(13, 10)).matches(&e));
        assert!(!EntryFilter::new().excluding_projects([4]).matches(&e));
        assert!(!EntryFilter::new().billable(false).matches(&e));
    }

    #[test]
    fn test_open_entries_never_match_end_bounds() {
        let open = entry(4, at(13, 9), None);
        assert!(EntryFilter::for_user(1).project(4).matches(&open));
        assert!(!EntryFilter::new().ended_after(at(1, 0)).matches(&open));
        assert!(!EntryFilter::new().ended_before(at(31, 0)).matches(&open));
    }

    #[test]
    fn test_store_error_conversion() {
        let err: TpError = StoreError::not_found("TimeEntry", 9).into();
        assert_eq!(err.error_code(), TpError::not_found("TimeEntry", 9).error_code());

        let err: TpError = StoreError::Conflict("duplicate".into()).into();
        assert!(matches!(err, TpError::Conflict { .. }));
    }
}
