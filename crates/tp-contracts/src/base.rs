//! Base contract system

use rust_decimal::Decimal;
use tp_core::error::ValidationErrors;
use tp_core::traits::Id;

/// Result of contract validation
pub type ValidationResult = Result<(), ValidationErrors>;

/// Validates a record of type `T`
pub trait Contract<T>: Send + Sync {
    fn validate(&self, entity: &T) -> ValidationResult;
}

/// Fold the derive-level checks of a `validator::Validate` record into
/// `errors`, one message per failed rule
pub fn merge_field_errors<T: validator::Validate>(entity: &T, errors: &mut ValidationErrors) {
    if let Err(field_errors) = entity.validate() {
        for (field, failures) in field_errors.field_errors() {
            for failure in failures {
                let message = match &failure.message {
                    Some(message) => message.to_string(),
                    None => describe(&failure.code),
                };
                errors.add(field.to_string(), message);
            }
        }
    }
}

fn describe(code: &str) -> String {
    match code {
        "range" => "is out of range".to_string(),
        "length" => "is too long".to_string(),
        "negative_hours" | "negative" => "must be greater than or equal to 0".to_string(),
        other => format!("is invalid ({})", other),
    }
}

pub fn validate_reference(field: &str, id: Id, errors: &mut ValidationErrors) {
    if id <= 0 {
        errors.add(field, "can't be blank");
    }
}

pub fn validate_non_negative(field: &str, value: Decimal, errors: &mut ValidationErrors) {
    if value < Decimal::ZERO {
        errors.add(field, "must be greater than or equal to 0");
    }
}
