//! Weekly allocation blocks
//!
//! Table: assignment_allocations (unique on assignment_id, date)

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tp_core::traits::{Entity, Id, Identifiable};
use tp_core::types::Week;
use validator::{Validate, ValidationError};

/// Hours planned for one assignment during one week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AssignmentAllocation {
    pub id: Option<Id>,
    pub assignment_id: Id,
    /// Monday of the allocated week
    pub date: NaiveDate,
    #[validate(custom = "validate_hours")]
    pub hours: Decimal,
}

impl Identifiable for AssignmentAllocation {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Entity for AssignmentAllocation {
    const TABLE_NAME: &'static str = "assignment_allocations";
    const TYPE_NAME: &'static str = "AssignmentAllocation";
}

impl AssignmentAllocation {
    pub fn week(&self) -> Week {
        Week::containing(self.date)
    }

    /// `[monday, next monday)` as instants
    pub fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        self.week().window()
    }
}

/// Input for a new block; the date is snapped to its week's Monday
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAllocation {
    pub assignment_id: Id,
    pub date: NaiveDate,
    #[validate(custom = "validate_hours")]
    pub hours: Decimal,
}

impl NewAllocation {
    pub fn new(assignment_id: Id, week: Week, hours: Decimal) -> Self {
        Self {
            assignment_id,
            date: week.start(),
            hours,
        }
    }

    pub fn into_allocation(self) -> AssignmentAllocation {
        AssignmentAllocation {
            id: None,
            assignment_id: self.assignment_id,
            date: Week::containing(self.date).start(),
            hours: self.hours,
        }
    }
}

fn validate_hours(hours: &Decimal) -> Result<(), ValidationError> {
    if hours.is_sign_negative() && !hours.is_zero() {
        return Err(ValidationError::new("negative_hours"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_into_allocation_snaps_to_monday() {
        let block = NewAllocation {
            assignment_id: 4,
            date: date(2024, 5, 16),
            hours: Decimal::from(12),
        }
        .into_allocation();
        assert_eq!(block.date, date(2024, 5, 13));
        assert_eq!(block.week().start(), date(2024, 5, 13));
        assert!(block.id.is_none());
    }

    #[test]
    fn test_window() {
        let block = NewAllocation::new(1, Week::containing(date(2024, 5, 13)), Decimal::ZERO)
            .into_allocation();
        let (start, end) = block.window();
        assert_eq!(start.date_naive(), date(2024, 5, 13));
        assert_eq!(end.date_naive(), date(2024, 5, 20));
    }

    #[test]
    fn test_hours_must_not_be_negative() {
        let mut block = NewAllocation::new(1, Week::containing(date(2024, 5, 13)), Decimal::ZERO)
            .into_allocation();
        assert!(block.validate().is_ok());
        block.hours = Decimal::from(-1);
        assert!(block.validate().is_err());
    }
}
