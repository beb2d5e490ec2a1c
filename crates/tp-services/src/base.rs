//! Base write-service plumbing
//!
//! Every write follows the same steps: build the record, validate it
//! through its contract, persist it. Contract failures come back as a failed
//! `ServiceResult`; store failures are converted into `TpError` first.

use std::future::Future;

use tp_contracts::Contract;
use tp_core::error::TpError;
use tp_core::result::ServiceResult;
use tp_db::StoreResult;

/// Validate `record` through `contract` and hand it to `persist` when valid
pub async fn validate_and_persist<T, C, F, Fut>(contract: &C, record: T, persist: F) -> ServiceResult<T>
where
    C: Contract<T> + ?Sized,
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    if let Err(errors) = contract.validate(&record) {
        return ServiceResult::failure(errors);
    }

    persist(record).await.map_err(TpError::from).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tp_contracts::ValidationResult;
    use tp_core::error::ValidationErrors;
    use tp_db::StoreError;

    struct Positive;

    impl Contract<i64> for Positive {
        fn validate(&self, value: &i64) -> ValidationResult {
            let mut errors = ValidationErrors::new();
            if *value <= 0 {
                errors.add("value", "must be positive");
            }
            errors.into_result()
        }
    }

    #[tokio::test]
    async fn test_invalid_record_is_not_persisted() {
        let mut persisted = false;
        let result = validate_and_persist(&Positive, -1_i64, |v| {
            persisted = true;
            async move { Ok(v) }
        })
        .await;

        assert!(result.is_failure());
        assert!(result.errors().has_error("value"));
        assert!(!persisted);
    }

    #[tokio::test]
    async fn test_store_conflict_becomes_failure() {
        let result = validate_and_persist(&Positive, 3_i64, |_| async {
            Err(StoreError::Conflict("taken".into()))
        })
        .await;

        assert!(result.is_failure());
        assert_eq!(result.errors().full_messages(), vec!["Conflict: taken".to_string()]);
    }

    #[tokio::test]
    async fn test_valid_record_is_persisted() {
        let result = validate_and_persist(&Positive, 3_i64, |v| async move { Ok(v * 2) }).await;
        assert_eq!(result.into_result().unwrap(), 6);
    }
}
