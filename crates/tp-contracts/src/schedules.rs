//! Contract for person schedules

use rust_decimal::Decimal;
use tp_core::error::ValidationErrors;
use tp_models::PersonSchedule;

use crate::base::{validate_non_negative, validate_reference, Contract, ValidationResult};

const HOURS_PER_WEEK_LIMIT: i64 = 168;

#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleContract;

impl Contract<PersonSchedule> for ScheduleContract {
    fn validate(&self, schedule: &PersonSchedule) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        validate_reference("contact", schedule.contact_id, &mut errors);
        validate_non_negative("hours_per_week", schedule.hours_per_week, &mut errors);
        if schedule.hours_per_week > Decimal::from(HOURS_PER_WEEK_LIMIT) {
            errors.add("hours_per_week", "can't exceed the hours in a week");
        }

        errors.into_result()
    }
}
