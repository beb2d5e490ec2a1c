//! Contract for time entries

use tp_core::error::ValidationErrors;
use tp_models::TimeEntry;

use crate::base::{merge_field_errors, validate_reference, Contract, ValidationResult};

/// Validates an entry before it is recorded or updated
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeEntryContract;

impl TimeEntryContract {
    pub fn new() -> Self {
        Self
    }

    /// End must not precede start, and the paused time must fit in the span
    fn validate_times(&self, entry: &TimeEntry, errors: &mut ValidationErrors) {
        let Some(end) = entry.end_time else {
            return;
        };
        if end < entry.start_time {
            errors.add("end_time", "must be after the start time");
            return;
        }
        let span = (end - entry.start_time).num_seconds();
        if entry.seconds_paused > span {
            errors.add("seconds_paused", "exceeds the length of the entry");
        }
    }

    /// Only open entries can be paused
    fn validate_pause(&self, entry: &TimeEntry, errors: &mut ValidationErrors) {
        if let Some(paused_at) = entry.pause_time {
            if entry.end_time.is_some() {
                errors.add("pause_time", "can't be set on a closed entry");
            } else if paused_at < entry.start_time {
                errors.add("pause_time", "must be after the start time");
            }
        }
    }
}

impl Contract<TimeEntry> for TimeEntryContract {
    fn validate(&self, entry: &TimeEntry) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        validate_reference("user", entry.user_id, &mut errors);
        validate_reference("project", entry.project_id, &mut errors);
        validate_reference("location", entry.location_id, &mut errors);
        merge_field_errors(entry, &mut errors);

        self.validate_times(entry, &mut errors);
        self.validate_pause(entry, &mut errors);

        errors.into_result()
    }
}
