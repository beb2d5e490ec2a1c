//! Contract and assignment registry
//!
//! Creates contracts and assignments and answers the hour questions asked
//! about them. Every "hours worked" figure is a read-only view over the
//! ledger, memoized in the caller's [`ComputationContext`].

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use tp_contracts::{AssignmentContract, Contract, ContractTermsContract};
use tp_core::error::TpError;
use tp_core::result::{ServiceResult, TpResult};
use tp_core::traits::{Entity, Id, Identifiable};
use tp_core::types::{midnight, Week};
use tp_db::{EntryFilter, Store};
use tp_models::{
    assignment::sort_by_priority, ContractAssignment, NewAssignment, NewContract, ProjectContract,
};

use crate::base::validate_and_persist;
use crate::context::{ComputationContext, Metric};
use crate::identity::user_for_contact;

pub struct RegistryService<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for RegistryService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store> RegistryService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, params), fields(project_id = params.project_id))]
    pub async fn create_contract(&self, params: NewContract) -> ServiceResult<ProjectContract> {
        let store = &*self.store;
        let result = validate_and_persist(
            &ContractTermsContract,
            params.into_contract(),
            |contract| async move { store.insert_contract(&contract).await },
        )
        .await;

        if let Some(contract) = result.result() {
            info!(contract_id = ?contract.id, num_hours = %contract.num_hours, "contract created");
        }
        result
    }

    /// Add a person to a contract. The assignment must fit inside the
    /// contract's dates and a person is assigned to a contract once.
    #[instrument(skip(self, params), fields(contract_id = params.contract_id, contact_id = params.contact_id))]
    pub async fn create_assignment(&self, params: NewAssignment) -> ServiceResult<ContractAssignment> {
        let contract = match self.find_contract(params.contract_id).await {
            Ok(contract) => contract,
            Err(err) => return Err::<ContractAssignment, _>(err).into(),
        };

        let store = &*self.store;
        let result = validate_and_persist(
            &AssignmentContract::within(&contract),
            params.into_assignment(),
            |assignment| async move { store.insert_assignment(&assignment).await },
        )
        .await;

        if let Some(assignment) = result.result() {
            info!(assignment_id = ?assignment.id, "assignment created");
        }
        result
    }

    pub async fn find_contract(&self, contract_id: Id) -> TpResult<ProjectContract> {
        self.store
            .find_contract(contract_id)
            .await?
            .ok_or_else(|| TpError::not_found(ProjectContract::TYPE_NAME, contract_id))
    }

    pub async fn find_assignment(&self, assignment_id: Id) -> TpResult<ContractAssignment> {
        self.store
            .find_assignment(assignment_id)
            .await?
            .ok_or_else(|| TpError::not_found(ContractAssignment::TYPE_NAME, assignment_id))
    }

    pub async fn contract_of(&self, assignment: &ContractAssignment) -> TpResult<ProjectContract> {
        self.find_contract(assignment.contract_id).await
    }

    pub async fn assignments_for_contact(&self, contact_id: Id) -> TpResult<Vec<ContractAssignment>> {
        Ok(self.store.assignments_for_contact(contact_id).await?)
    }

    /// Hours logged on the contract's project between its start and the end
    /// of its last day
    pub async fn contract_hours_worked(
        &self,
        ctx: &ComputationContext,
        contract: &ProjectContract,
    ) -> TpResult<Decimal> {
        let contract_id = persisted(contract)?;
        ctx.memoize(Metric::ContractHoursWorked(contract_id), || async {
            let filter = EntryFilter::new()
                .project(contract.project_id)
                .started_on_or_after(midnight(contract.start_date))
                .ended_before(day_after(contract.end_date)?);
            Ok::<_, TpError>(self.store.sum_hours(&filter).await?)
        })
        .await
    }

    pub async fn contract_hours_assigned(&self, contract: &ProjectContract) -> TpResult<Decimal> {
        let contract_id = persisted(contract)?;
        let assignments = self.store.assignments_for_contract(contract_id).await?;
        Ok(assignments.iter().map(|a| a.num_hours).sum())
    }

    pub async fn contract_hours_allocated(&self, contract: &ProjectContract) -> TpResult<Decimal> {
        let contract_id = persisted(contract)?;
        Ok(self.store.sum_allocated_for_contract(contract_id).await?)
    }

    /// Budget minus hours worked; negative when the contract is overrun
    pub async fn contract_hours_remaining(
        &self,
        ctx: &ComputationContext,
        contract: &ProjectContract,
    ) -> TpResult<Decimal> {
        Ok(contract.num_hours - self.contract_hours_worked(ctx, contract).await?)
    }

    pub fn contract_weeks_remaining(&self, ctx: &ComputationContext, contract: &ProjectContract) -> Vec<Week> {
        contract.weeks_remaining(ctx.today())
    }

    /// Hours the assigned person logged on the contract's project during the
    /// assignment
    pub async fn assignment_hours_worked(
        &self,
        ctx: &ComputationContext,
        assignment: &ContractAssignment,
    ) -> TpResult<Decimal> {
        let assignment_id = persisted(assignment)?;
        ctx.memoize(Metric::AssignmentHoursWorked(assignment_id), || async {
            let end = day_after(assignment.end_date)?;
            self.worked_between(assignment, midnight(assignment.start_date), end).await
        })
        .await
    }

    pub async fn assignment_hours_remaining(
        &self,
        ctx: &ComputationContext,
        assignment: &ContractAssignment,
    ) -> TpResult<Decimal> {
        Ok(assignment.num_hours - self.assignment_hours_worked(ctx, assignment).await?)
    }

    /// Hours logged on the assignment before `week_start`
    pub async fn assignment_hours_worked_before(
        &self,
        ctx: &ComputationContext,
        assignment: &ContractAssignment,
        week_start: NaiveDate,
    ) -> TpResult<Decimal> {
        let assignment_id = persisted(assignment)?;
        ctx.memoize(Metric::AssignmentWorkedBefore(assignment_id, week_start), || async {
            self.worked_between(assignment, midnight(assignment.start_date), midnight(week_start))
                .await
        })
        .await
    }

    /// Hours logged on the assignment's project by its person, starting at
    /// or after `start` and ending before `end`
    pub async fn assignment_hours_worked_within_window(
        &self,
        assignment: &ContractAssignment,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> TpResult<Decimal> {
        self.worked_between(assignment, start, end).await
    }

    /// Sum of every allocation block of the assignment
    pub async fn assignment_hours_allocated(
        &self,
        ctx: &ComputationContext,
        assignment: &ContractAssignment,
    ) -> TpResult<Decimal> {
        let assignment_id = persisted(assignment)?;
        ctx.memoize(Metric::AssignmentAllocated(assignment_id), || async {
            let blocks = self.store.allocations_for_assignment(assignment_id).await?;
            Ok::<_, TpError>(blocks.iter().map(|b| b.hours).sum())
        })
        .await
    }

    /// The contact's assignments whose contract ends in, starts in or spans
    /// `week`, in allocation order
    #[instrument(skip(self), fields(week = %week.start()))]
    pub async fn active_during_week(&self, contact_id: Id, week: Week) -> TpResult<Vec<ContractAssignment>> {
        let mut active = Vec::new();
        for assignment in self.store.assignments_for_contact(contact_id).await? {
            let contract = self.contract_of(&assignment).await?;
            if contract.active_during(week) {
                active.push(assignment);
            }
        }

        sort_by_priority(&mut active, week);
        debug!(contact_id, active = active.len(), "assignments active during week");
        Ok(active)
    }

    async fn worked_between(
        &self,
        assignment: &ContractAssignment,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> TpResult<Decimal> {
        let Some(user_id) = user_for_contact(&*self.store, assignment.contact_id).await? else {
            debug!(contact_id = assignment.contact_id, "contact has no user account, no hours worked");
            return Ok(Decimal::ZERO);
        };
        let contract = self.contract_of(assignment).await?;

        let filter = EntryFilter::for_user(user_id)
            .project(contract.project_id)
            .started_on_or_after(start)
            .ended_before(end);
        Ok(self.store.sum_hours(&filter).await?)
    }
}

/// Midnight after `day`, the exclusive end of an inclusive date range
fn day_after(day: NaiveDate) -> TpResult<DateTime<Utc>> {
    day.checked_add_days(Days::new(1))
        .map(midnight)
        .ok_or_else(|| TpError::Internal(format!("no day after {}", day)))
}

/// Derived figures are only defined for stored records
fn persisted<E: Entity>(record: &E) -> TpResult<Id> {
    record
        .id()
        .ok_or_else(|| TpError::Internal(format!("{} has not been saved", E::TYPE_NAME)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{add_assignment, add_contract, at, date, hours, log_hours};
    use tp_db::{AllocationStore, MemoryStore};
    use tp_models::{AssignmentAllocation, ContractStatus};

    const CONTACT: Id = 1;
    const USER: Id = 10;
    const PROJECT: Id = 5;

    fn context(today: NaiveDate) -> ComputationContext {
        ComputationContext::new(at(today, 12, 0))
    }

    #[tokio::test]
    async fn test_create_contract_validates_terms() {
        let store = Arc::new(MemoryStore::new());
        let registry = RegistryService::new(store.clone());

        let result = registry
            .create_contract(NewContract {
                project_id: PROJECT,
                start_date: date(2024, 6, 1),
                end_date: date(2024, 1, 1),
                num_hours: hours(-5),
                status: ContractStatus::Upcoming,
            })
            .await;

        assert!(result.is_failure());
        assert!(result.errors().has_error("end_date"));
        assert!(result.errors().has_error("num_hours"));
    }

    #[tokio::test]
    async fn test_create_assignment_checks_contract() {
        let store = Arc::new(MemoryStore::new());
        let registry = RegistryService::new(store.clone());
        let contract = add_contract(&store, PROJECT, date(2024, 1, 1), date(2024, 3, 31), 200).await;
        let params = NewAssignment {
            contract_id: contract.id.unwrap(),
            contact_id: CONTACT,
            start_date: date(2024, 1, 1),
            end_date: date(2024, 2, 29),
            num_hours: hours(80),
            min_hours_per_week: 10,
        };

        assert!(registry.create_assignment(params.clone()).await.is_success());
        assert!(registry.create_assignment(params.clone()).await.is_failure());

        let outside = NewAssignment {
            contact_id: 2,
            end_date: date(2024, 5, 1),
            ..params.clone()
        };
        let result = registry.create_assignment(outside).await;
        assert!(result.errors().has_error("end_date"));

        let orphan = NewAssignment {
            contract_id: 999,
            ..params
        };
        assert!(registry.create_assignment(orphan).await.is_failure());
    }

    #[tokio::test]
    async fn test_contract_hours() {
        let store = Arc::new(MemoryStore::new());
        store.link_contact(CONTACT, USER).await;
        let contract = add_contract(&store, PROJECT, date(2024, 1, 1), date(2024, 1, 31), 100).await;
        let assignment = add_assignment(&store, &contract, CONTACT, date(2024, 1, 31), 60, 10).await;
        add_assignment(&store, &contract, 2, date(2024, 1, 31), 30, 5).await;
        log_hours(&store, USER, PROJECT, date(2024, 1, 10), 6).await;
        log_hours(&store, 11, PROJECT, date(2024, 1, 31), 4).await;
        log_hours(&store, USER, PROJECT, date(2024, 2, 1), 8).await;
        log_hours(&store, USER, 6, date(2024, 1, 11), 3).await;
        store
            .insert_allocation(&AssignmentAllocation {
                id: None,
                assignment_id: assignment.id.unwrap(),
                date: date(2024, 1, 8),
                hours: hours(12),
            })
            .await
            .unwrap();

        let registry = RegistryService::new(store.clone());
        let ctx = context(date(2024, 1, 17));

        assert_eq!(registry.contract_hours_worked(&ctx, &contract).await.unwrap(), hours(10));
        assert_eq!(registry.contract_hours_remaining(&ctx, &contract).await.unwrap(), hours(90));
        assert_eq!(registry.contract_hours_assigned(&contract).await.unwrap(), hours(90));
        assert_eq!(registry.contract_hours_allocated(&contract).await.unwrap(), hours(12));

        let weeks = registry.contract_weeks_remaining(&ctx, &contract);
        assert_eq!(weeks.first().map(|w| w.start()), Some(date(2024, 1, 15)));
        assert_eq!(weeks.last().map(|w| w.start()), Some(date(2024, 1, 29)));
    }

    #[tokio::test]
    async fn test_assignment_hours() {
        let store = Arc::new(MemoryStore::new());
        store.link_contact(CONTACT, USER).await;
        let contract = add_contract(&store, PROJECT, date(2024, 1, 1), date(2024, 1, 31), 100).await;
        let assignment = add_assignment(&store, &contract, CONTACT, date(2024, 1, 31), 60, 10).await;
        log_hours(&store, USER, PROJECT, date(2024, 1, 3), 5).await;
        log_hours(&store, USER, PROJECT, date(2024, 1, 10), 7).await;
        log_hours(&store, 11, PROJECT, date(2024, 1, 10), 7).await;

        let registry = RegistryService::new(store.clone());
        let ctx = context(date(2024, 1, 17));

        assert_eq!(registry.assignment_hours_worked(&ctx, &assignment).await.unwrap(), hours(12));
        assert_eq!(registry.assignment_hours_remaining(&ctx, &assignment).await.unwrap(), hours(48));
        assert_eq!(
            registry
                .assignment_hours_worked_before(&ctx, &assignment, date(2024, 1, 8))
                .await
                .unwrap(),
            hours(5)
        );
        assert_eq!(
            registry
                .assignment_hours_worked_within_window(
                    &assignment,
                    midnight(date(2024, 1, 8)),
                    midnight(date(2024, 1, 15)),
                )
                .await
                .unwrap(),
            hours(7)
        );
    }

    #[tokio::test]
    async fn test_assignment_without_user_has_no_hours() {
        let store = Arc::new(MemoryStore::new());
        let contract = add_contract(&store, PROJECT, date(2024, 1, 1), date(2024, 1, 31), 100).await;
        let assignment = add_assignment(&store, &contract, CONTACT, date(2024, 1, 31), 60, 10).await;
        log_hours(&store, USER, PROJECT, date(2024, 1, 3), 5).await;

        let registry = RegistryService::new(store.clone());
        let ctx = context(date(2024, 1, 17));
        assert_eq!(registry.assignment_hours_worked(&ctx, &assignment).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_hours_are_memoized_per_context() {
        let store = Arc::new(MemoryStore::new());
        store.link_contact(CONTACT, USER).await;
        let contract = add_contract(&store, PROJECT, date(2024, 1, 1), date(2024, 1, 31), 100).await;
        log_hours(&store, USER, PROJECT, date(2024, 1, 3), 5).await;

        let registry = RegistryService::new(store.clone());
        let ctx = context(date(2024, 1, 17));
        assert_eq!(registry.contract_hours_worked(&ctx, &contract).await.unwrap(), hours(5));

        log_hours(&store, USER, PROJECT, date(2024, 1, 4), 2).await;
        assert_eq!(registry.contract_hours_worked(&ctx, &contract).await.unwrap(), hours(5));

        let fresh = context(date(2024, 1, 17));
        assert_eq!(registry.contract_hours_worked(&fresh, &contract).await.unwrap(), hours(7));
    }

    #[tokio::test]
    async fn test_active_during_week_orders_by_priority() {
        let store = Arc::new(MemoryStore::new());
        let long = add_contract(&store, PROJECT, date(2024, 1, 1), date(2024, 6, 30), 500).await;
        let ending = add_contract(&store, 6, date(2024, 1, 1), date(2024, 3, 13), 100).await;
        let starting = add_contract(&store, 7, date(2024, 3, 12), date(2024, 4, 30), 100).await;
        let finished = add_contract(&store, 8, date(2024, 1, 1), date(2024, 2, 1), 100).await;

        let ongoing = add_assignment(&store, &long, CONTACT, date(2024, 6, 30), 200, 10).await;
        let ends = add_assignment(&store, &ending, CONTACT, date(2024, 3, 13), 50, 5).await;
        let starts = add_assignment(&store, &starting, CONTACT, date(2024, 4, 30), 50, 5).await;
        add_assignment(&store, &finished, CONTACT, date(2024, 2, 1), 50, 5).await;

        let registry = RegistryService::new(store.clone());
        let week = Week::containing(date(2024, 3, 13));
        let active = registry.active_during_week(CONTACT, week).await.unwrap();

        let ids: Vec<Option<Id>> = active.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![ends.id, starts.id, ongoing.id]);
    }

    #[tokio::test]
    async fn test_active_during_week_keeps_contract_ending_next_monday() {
        let store = Arc::new(MemoryStore::new());
        let contract = add_contract(&store, PROJECT, date(2024, 1, 1), date(2024, 3, 18), 100).await;
        let assignment = add_assignment(&store, &contract, CONTACT, date(2024, 3, 18), 100, 10).await;

        let registry = RegistryService::new(store.clone());
        let active = registry
            .active_during_week(CONTACT, Week::containing(date(2024, 3, 11)))
            .await
            .unwrap();

        let ids: Vec<Option<Id>> = active.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![assignment.id]);
    }
}
