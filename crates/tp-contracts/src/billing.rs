//! Contracts for repeat periods and billing windows

use tp_core::error::ValidationErrors;
use tp_models::{BillingWindow, RepeatPeriod};

use crate::base::{merge_field_errors, validate_reference, Contract, ValidationResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct RepeatPeriodContract;

impl Contract<RepeatPeriod> for RepeatPeriodContract {
    fn validate(&self, period: &RepeatPeriod) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        merge_field_errors(period, &mut errors);
        errors.into_result()
    }
}

/// A window must be non-empty and, when the previous window of its period
/// is given, start exactly where that one ends
#[derive(Debug, Clone, Copy, Default)]
pub struct BillingWindowContract<'a> {
    previous: Option<&'a BillingWindow>,
}

impl<'a> BillingWindowContract<'a> {
    pub fn new() -> Self {
        Self { previous: None }
    }

    pub fn following(previous: &'a BillingWindow) -> Self {
        Self {
            previous: Some(previous),
        }
    }
}

impl<'a> Contract<BillingWindow> for BillingWindowContract<'a> {
    fn validate(&self, window: &BillingWindow) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        validate_reference("period", window.period_id, &mut errors);
        if window.end_date <= window.date {
            errors.add("end_date", "must be after the start date");
        }
        if let Some(previous) = self.previous {
            if previous.period_id != window.period_id {
                errors.add("period", "does not match the previous window");
            } else if previous.end_date != window.date {
                errors.add("date", "must continue from the previous window");
            }
        }

        errors.into_result()
    }
}
