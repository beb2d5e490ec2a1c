//! Contract assignment model
//!
//! Table: contract_assignments
//!
//! An assignment is one person's share of a contract: an hour budget over
//! its own date range plus a weekly minimum that is reserved before other,
//! shorter assignments get their share.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tp_core::traits::{Entity, Id, Identifiable};
use tp_core::types::Week;
use validator::Validate;

/// How an assignment relates to a given week. Ordering is allocation order:
/// ending assignments are resolved first, ongoing ones last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekPriority {
    /// End date falls in the week
    Ending,
    /// Start date falls in the week
    Starting,
    /// Neither
    Ongoing,
}

impl WeekPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ending => "ending",
            Self::Starting => "starting",
            Self::Ongoing => "ongoing",
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            Self::Ending => 0,
            Self::Starting => 1,
            Self::Ongoing => 2,
        }
    }
}

/// Contract assignment entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ContractAssignment {
    pub id: Option<Id>,
    pub contract_id: Id,
    /// Person (contact) doing the work
    pub contact_id: Id,
    pub start_date: NaiveDate,
    /// Last day of the assignment (inclusive)
    pub end_date: NaiveDate,
    /// Budgeted hours
    pub num_hours: Decimal,
    /// Hours per week reserved for this assignment
    #[validate(range(min = 0))]
    pub min_hours_per_week: i32,
}

impl Identifiable for ContractAssignment {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Entity for ContractAssignment {
    const TABLE_NAME: &'static str = "contract_assignments";
    const TYPE_NAME: &'static str = "ContractAssignment";
}

impl ContractAssignment {
    pub fn min_hours(&self) -> Decimal {
        Decimal::from(self.min_hours_per_week)
    }

    pub fn priority_for(&self, week: Week) -> WeekPriority {
        if week.contains(self.end_date) {
            WeekPriority::Ending
        } else if week.contains(self.start_date) {
            WeekPriority::Starting
        } else {
            WeekPriority::Ongoing
        }
    }

    /// Allocation order for `week`: priority, then nearest end date, then id
    pub fn priority_key(&self, week: Week) -> (WeekPriority, NaiveDate, Id) {
        (self.priority_for(week), self.end_date, self.id.unwrap_or(Id::MAX))
    }

    /// Whether the assignment reserves its minimum against `other`: it
    /// runs at least as long and is a different assignment of the same person
    pub fn outlasts(&self, other: &ContractAssignment) -> bool {
        self.contact_id == other.contact_id
            && self.id != other.id
            && self.end_date >= other.end_date
    }
}

/// Sort assignments into allocation order for `week`
pub fn sort_by_priority(assignments: &mut [ContractAssignment], week: Week) {
    assignments.sort_by_key(|a| a.priority_key(week));
}

/// Input for creating an assignment
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAssignment {
    pub contract_id: Id,
    pub contact_id: Id,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub num_hours: Decimal,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub min_hours_per_week: i32,
}

impl NewAssignment {
    pub fn into_assignment(self) -> ContractAssignment {
        ContractAssignment {
            id: None,
            contract_id: self.contract_id,
            contact_id: self.contact_id,
            start_date: self.start_date,
            end_date: self.end_date,
            num_hours: self.num_hours,
            min_hours_per_week: self.min_hours_per_week,
        }
    }
}
