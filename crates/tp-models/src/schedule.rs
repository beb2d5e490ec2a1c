//! Person schedule model
//!
//! Table: person_schedules (one row per contact)

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tp_core::traits::{Entity, Id, Identifiable};

/// Weekly capacity of a person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonSchedule {
    pub id: Option<Id>,
    pub contact_id: Id,
    pub hours_per_week: Decimal,
    /// Date the person is expected to be available until
    pub end_date: NaiveDate,
}

impl Identifiable for PersonSchedule {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Entity for PersonSchedule {
    const TABLE_NAME: &'static str = "person_schedules";
    const TYPE_NAME: &'static str = "PersonSchedule";
}

impl PersonSchedule {
    pub fn new(contact_id: Id, hours_per_week: Decimal, end_date: NaiveDate) -> Self {
        Self {
            id: None,
            contact_id,
            hours_per_week,
            end_date,
        }
    }

    /// Capacity between `today` and the schedule's end date. Zero once the
    /// end date has passed.
    pub fn hours_available(&self, today: NaiveDate) -> Decimal {
        let days = (self.end_date - today).num_days().max(0);
        (self.hours_per_week * Decimal::from(days) / Decimal::from(7)).round_dp(2)
    }
}
