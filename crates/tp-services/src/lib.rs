//! # tp-services
//!
//! Business logic services for Timepiece RS.
//!
//! Write operations validate through `tp-contracts` and return a
//! `ServiceResult`; computations return `TpResult`. Derived hour figures
//! are memoized in a [`ComputationContext`] that lives for one pass.

pub mod allocations;
pub mod allocator;
pub mod app;
pub mod base;
pub mod billing;
pub mod context;
pub mod identity;
pub mod ledger;
pub mod overtime;
pub mod registry;
pub mod schedule;

#[cfg(test)]
mod testing;

pub use allocations::AllocationService;
pub use allocator::{plan_week, weekly_commitment, AllocatorService, Candidate, CommitmentInputs, WeekState};
pub use app::Services;
pub use base::validate_and_persist;
pub use billing::BillingService;
pub use context::{ComputationContext, Metric};
pub use ledger::{LedgerService, PeriodSummary, WindowTotal};
pub use overtime::OvertimeService;
pub use registry::RegistryService;
pub use schedule::ScheduleService;
