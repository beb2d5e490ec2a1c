//! # tp-contracts
//!
//! Record validation for Timepiece RS.
//!
//! Contracts validate records before the services persist them. Each
//! contract collects every problem it finds into a single
//! `ValidationErrors` instead of stopping at the first one.

pub mod allocations;
pub mod assignments;
pub mod base;
pub mod billing;
pub mod contracts;
pub mod schedules;
pub mod time_entries;

pub use allocations::AllocationContract;
pub use assignments::AssignmentContract;
pub use base::*;
pub use billing::{BillingWindowContract, RepeatPeriodContract};
pub use contracts::ContractTermsContract;
pub use schedules::ScheduleContract;
pub use time_entries::TimeEntryContract;
