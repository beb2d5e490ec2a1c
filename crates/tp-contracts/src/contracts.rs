//! Contract for project contract terms

use tp_core::error::ValidationErrors;
use tp_models::ProjectContract;

use crate::base::{validate_non_negative, validate_reference, Contract, ValidationResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct ContractTermsContract;

impl Contract<ProjectContract> for ContractTermsContract {
    fn validate(&self, contract: &ProjectContract) -> ValidationResult {
        let mut errors = ValidationErrors::new();

        validate_reference("project", contract.project_id, &mut errors);
        validate_non_negative("num_hours", contract.num_hours, &mut errors);
        if contract.end_date < contract.start_date {
            errors.add("end_date", "must be on or after the start date");
        }

        errors.into_result()
    }
}
