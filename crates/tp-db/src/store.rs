//! Store traits
//!
//! Services only talk to storage through these traits. `MemoryStore` and
//! `PgStore` implement all of them.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tp_core::traits::Id;
use tp_models::{
    AssignmentAllocation, BillingWindow, ContractAssignment, PersonRepeatPeriod, PersonSchedule,
    ProjectContract, RepeatPeriod, TimeEntry,
};

use crate::repository::{EntryFilter, StoreResult};

/// Read-modify-write over one person's open entries.
///
/// Receives every open entry of the person. Entries left in the vector are
/// written back; pushed entries without an id are inserted.
pub type OpenEntryMutation = Box<dyn FnOnce(&mut Vec<TimeEntry>) -> StoreResult<()> + Send>;

#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn insert_entry(&self, entry: &TimeEntry) -> StoreResult<TimeEntry>;

    async fn update_entry(&self, entry: &TimeEntry) -> StoreResult<TimeEntry>;

    async fn find_entry(&self, id: Id) -> StoreResult<Option<TimeEntry>>;

    /// Matching entries ordered by start time
    async fn find_entries(&self, filter: &EntryFilter) -> StoreResult<Vec<TimeEntry>>;

    /// Sum of `hours` over matching entries, zero when nothing matches
    async fn sum_hours(&self, filter: &EntryFilter) -> StoreResult<Decimal>;

    /// Entries of `user_id` ending in, starting in, or enclosing `[start, end]`
    async fn entries_intersecting(
        &self,
        user_id: Id,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<TimeEntry>>;

    async fn open_entries(&self, user_id: Id) -> StoreResult<Vec<TimeEntry>>;

    /// Open entries of everyone except `user_id`
    async fn active_entries_except(&self, user_id: Id) -> StoreResult<Vec<TimeEntry>>;

    /// Apply `mutation` atomically and return the written entries
    async fn mutate_open_entries(
        &self,
        user_id: Id,
        mutation: OpenEntryMutation,
    ) -> StoreResult<Vec<TimeEntry>>;
}

#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn insert_period(&self, period: &RepeatPeriod) -> StoreResult<RepeatPeriod>;

    async fn find_period(&self, id: Id) -> StoreResult<Option<RepeatPeriod>>;

    async fn active_periods(&self) -> StoreResult<Vec<RepeatPeriod>>;

    async fn latest_window(&self, period_id: Id) -> StoreResult<Option<BillingWindow>>;

    /// Insert windows in order, all or nothing
    async fn insert_windows(&self, windows: &[BillingWindow]) -> StoreResult<Vec<BillingWindow>>;

    /// Windows of a period, newest first, at most `limit`
    async fn latest_windows(&self, period_id: Id, limit: usize) -> StoreResult<Vec<BillingWindow>>;

    /// The window of the period that starts right after `window`
    async fn window_after(&self, window: &BillingWindow) -> StoreResult<Option<BillingWindow>>;

    async fn window_before(&self, window: &BillingWindow) -> StoreResult<Option<BillingWindow>>;

    /// The window with `date <= day < end_date`
    async fn window_containing(&self, period_id: Id, day: NaiveDate) -> StoreResult<Option<BillingWindow>>;

    /// Link a contact to a period; a contact has one period at most
    async fn link_person(&self, contact_id: Id, period_id: Id) -> StoreResult<PersonRepeatPeriod>;

    async fn period_for_contact(&self, contact_id: Id) -> StoreResult<Option<PersonRepeatPeriod>>;
}

#[async_trait]
pub trait ContractStore: Send + Sync {
    async fn insert_contract(&self, contract: &ProjectContract) -> StoreResult<ProjectContract>;

    async fn find_contract(&self, id: Id) -> StoreResult<Option<ProjectContract>>;

    /// Fails with `Conflict` when the contact already has an assignment on
    /// the contract
    async fn insert_assignment(&self, assignment: &ContractAssignment) -> StoreResult<ContractAssignment>;

    async fn find_assignment(&self, id: Id) -> StoreResult<Option<ContractAssignment>>;

    async fn assignments_for_contract(&self, contract_id: Id) -> StoreResult<Vec<ContractAssignment>>;

    async fn assignments_for_contact(&self, contact_id: Id) -> StoreResult<Vec<ContractAssignment>>;
}

#[async_trait]
pub trait AllocationStore: Send + Sync {
    /// Fails with `Conflict` when the assignment already has a block for
    /// the week
    async fn insert_allocation(&self, block: &AssignmentAllocation) -> StoreResult<AssignmentAllocation>;

    /// Upsert blocks on (assignment, date) in one transaction
    async fn save_allocations(&self, blocks: &[AssignmentAllocation]) -> StoreResult<Vec<AssignmentAllocation>>;

    async fn allocations_for_assignment(&self, assignment_id: Id) -> StoreResult<Vec<AssignmentAllocation>>;

    /// Blocks of every assignment of `contact_id` dated `week_start`
    async fn allocations_for_contact_week(
        &self,
        contact_id: Id,
        week_start: NaiveDate,
    ) -> StoreResult<Vec<AssignmentAllocation>>;

    /// Sum of block hours over every assignment of the contract
    async fn sum_allocated_for_contract(&self, contract_id: Id) -> StoreResult<Decimal>;
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Insert or replace the contact's schedule
    async fn upsert_schedule(&self, schedule: &PersonSchedule) -> StoreResult<PersonSchedule>;

    async fn schedule_for_contact(&self, contact_id: Id) -> StoreResult<Option<PersonSchedule>>;
}

/// Maps contacts (who assignments belong to) to user accounts (who entries
/// belong to)
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn user_for_contact(&self, contact_id: Id) -> StoreResult<Option<Id>>;

    async fn contact_for_user(&self, user_id: Id) -> StoreResult<Option<Id>>;
}

/// Everything the services need
pub trait Store:
    EntryStore + BillingStore + ContractStore + AllocationStore + ScheduleStore + IdentityProvider
{
}

impl<T> Store for T where
    T: EntryStore + BillingStore + ContractStore + AllocationStore + ScheduleStore + IdentityProvider
{
}
