//! # tp-models
//!
//! Domain models for Timepiece RS.
//!
//! This crate contains the record structs stored by `tp-db` together with
//! the domain logic that only needs the record itself (elapsed time, pause
//! state, billing window planning, weekly priority). Each model implements
//! the core traits from `tp-core`.

pub use tp_core::traits::{Entity, Id, Identifiable};

pub mod allocation;
pub mod assignment;
pub mod contract;
pub mod repeat_period;
pub mod schedule;
pub mod time_entry;

pub use allocation::{AssignmentAllocation, NewAllocation};
pub use assignment::{ContractAssignment, NewAssignment, WeekPriority};
pub use contract::{ContractStatus, NewContract, ProjectContract};
pub use repeat_period::{BillingWindow, PersonRepeatPeriod, RepeatInterval, RepeatPeriod};
pub use schedule::PersonSchedule;
pub use time_entry::{NewTimeEntry, TimeEntry};
