//! Project contract model
//!
//! Table: project_contracts
//!
//! A contract is a budget of hours negotiated for one project over a date
//! range. Its assignments split that budget between people.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tp_core::traits::{Entity, Id, Identifiable};
use tp_core::types::{generate_weeks, DateRange, Week};

/// Contract status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    #[default]
    Upcoming,
    Current,
    Complete,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Current => "current",
            Self::Complete => "complete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "upcoming" => Some(Self::Upcoming),
            "current" => Some(Self::Current),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }
}

/// Project contract entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectContract {
    pub id: Option<Id>,
    pub project_id: Id,
    pub start_date: NaiveDate,
    /// Last day covered by the contract (inclusive)
    pub end_date: NaiveDate,
    /// Budgeted hours
    pub num_hours: Decimal,
    #[serde(default)]
    pub status: ContractStatus,
}

impl Identifiable for ProjectContract {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Entity for ProjectContract {
    const TABLE_NAME: &'static str = "project_contracts";
    const TYPE_NAME: &'static str = "ProjectContract";
}

impl ProjectContract {
    pub fn is_complete(&self) -> bool {
        self.status == ContractStatus::Complete
    }

    pub fn period(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }

    /// Week starts from `today`'s week (or the contract's first week when
    /// it has not started yet) through the contract end
    pub fn weeks_remaining(&self, today: NaiveDate) -> Vec<Week> {
        generate_weeks(today.max(self.start_date), self.end_date)
    }

    /// Whether the contract is active during `week`: it ends in the week,
    /// starts in the week, or runs through the whole week
    pub fn active_during(&self, week: Week) -> bool {
        week.contains(self.end_date)
            || week.contains(self.start_date)
            || (self.start_date < week.start() && self.end_date >= week.next_start())
    }
}

/// Input for creating a contract
#[derive(Debug, Clone, Deserialize)]
pub struct NewContract {
    pub project_id: Id,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub num_hours: Decimal,
    #[serde(default)]
    pub status: ContractStatus,
}

impl NewContract {
    pub fn into_contract(self) -> ProjectContract {
        ProjectContract {
            id: None,
            project_id: self.project_id,
            start_date: self.start_date,
            end_date: self.end_date,
            num_hours: self.num_hours,
            status: self.status,
        }
    }
}
