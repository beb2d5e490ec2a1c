//! Contract for allocation blocks

use chrono::{Datelike, Weekday};
use tp_core::error::ValidationErrors;
use tp_models::AssignmentAllocation;

use crate::base::{merge_field_errors, validate_reference, Contract, ValidationResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct AllocationContract;

impl Contract<AssignmentAllocation> for AllocationContract {
    fn validate(&self, block: &AssignmentAllocation) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        validate_reference("assignment", block.assignment_id, &mut errors);
        merge_field_errors(block, &mut errors);
        if block.date.weekday() != Weekday::Mon {
            errors.add("date", "must be the first day of a week");
        }

        errors.into_result()
    }
}
