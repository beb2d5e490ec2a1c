//! Contract for contract assignments
//!
//! An assignment must fit inside its contract's dates when the contract is
//! known to the caller.

use tp_core::error::ValidationErrors;
use tp_models::{ContractAssignment, ProjectContract};

use crate::base::{
    merge_field_errors, validate_non_negative, validate_reference, Contract, ValidationResult,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct AssignmentContract<'a> {
    contract: Option<&'a ProjectContract>,
}

impl<'a> AssignmentContract<'a> {
    pub fn new() -> Self {
        Self { contract: None }
    }

    pub fn within(contract: &'a ProjectContract) -> Self {
        Self {
            contract: Some(contract),
        }
    }

    fn validate_contract_dates(&self, assignment: &ContractAssignment, errors: &mut ValidationErrors) {
        let Some(contract) = self.contract else {
            return;
        };
        if contract.id.is_some() && contract.id != Some(assignment.contract_id) {
            errors.add("contract", "does not match the assignment");
        }
        let period = contract.period();
        if !period.contains(assignment.start_date) {
            errors.add("start_date", "must be within the contract dates");
        }
        if !period.contains(assignment.end_date) {
            errors.add("end_date", "must be within the contract dates");
        }
    }
}

impl<'a> Contract<ContractAssignment> for AssignmentContract<'a> {
    fn validate(&self, assignment: &ContractAssignment) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        validate_reference("contract", assignment.contract_id, &mut errors);
        validate_reference("contact", assignment.contact_id, &mut errors);
        validate_non_negative("num_hours", assignment.num_hours, &mut errors);
        merge_field_errors(assignment, &mut errors);

        if assignment.end_date < assignment.start_date {
            errors.add("end_date", "must be on or after the start date");
        }
        self.validate_contract_dates(assignment, &mut errors);

        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use tp_models::{ContractStatus, NewAssignment, NewContract};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn contract() -> ProjectContract {
        let mut contract = NewContract {
            project_id: 1,
            start_date: date(2024, 1, 1),
            end_date: date(2024, 3, 31),
            num_hours: Decimal::from(200),
            status: ContractStatus::Current,
        }
        .into_contract();
        contract.id = Some(7);
        contract
    }

    fn assignment(start: NaiveDate, end: NaiveDate) -> ContractAssignment {
        NewAssignment {
            contract_id: 7,
            contact_id: 3,
            start_date: start,
            end_date: end,
            num_hours: Decimal::from(80),
            min_hours_per_week: 10,
        }
        .into_assignment()
    }

    #[test]
    fn test_valid_assignment() {
        let contract = contract();
        let a = assignment(date(2024, 1, 8), date(2024, 2, 29));
        assert!(AssignmentContract::within(&contract).validate(&a).is_ok());
        assert!(AssignmentContract::new().validate(&a).is_ok());
    }

    #[test]
    fn test_assignment_outside_contract() {
        let contract = contract();
        let a = assignment(date(2023, 12, 1), date(2024, 4, 30));
        let errors = AssignmentContract::within(&contract).validate(&a).unwrap_err();
        assert!(errors.has_error("start_date"));
        assert!(errors.has_error("end_date"));
    }

    #[test]
    fn test_negative_minimum() {
        let mut a = assignment(date(2024, 1, 8), date(2024, 2, 29));
        a.min_hours_per_week = -1;
        a.contact_id = 0;
        let errors = AssignmentContract::new().validate(&a).unwrap_err();
        assert!(errors.has_error("min_hours_per_week"));
        assert!(errors.has_error("contact"));
    }
}
