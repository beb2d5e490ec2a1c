//! Weekly commitment allocator
//!
//! Decides how many hours a person commits to each of their assignments in
//! a given week. Assignments are resolved one at a time in priority order
//! (ending, starting, ongoing). Each one gets what is left of the person's
//! weekly capacity after the minimums of longer-running assignments are set
//! aside, raised to its own minimum when capacity allows and capped to the
//! hours left on the assignment and on its contract.
//!
//! The arithmetic is pure: [`weekly_commitment`] for one assignment and
//! [`plan_week`] for an ordered pass. [`AllocatorService`] gathers the
//! inputs from the store and persists a pass in one batch.

use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info, instrument};

use tp_contracts::{AllocationContract, Contract};
use tp_core::clock::Clock;
use tp_core::config::ScheduleConfig;
use tp_core::error::TpError;
use tp_core::result::TpResult;
use tp_core::traits::Id;
use tp_core::types::Week;
use tp_db::Store;
use tp_models::{AssignmentAllocation, ContractAssignment, NewAllocation};

use crate::context::ComputationContext;
use crate::registry::RegistryService;
use crate::schedule::ScheduleService;

/// Figures one commitment is computed from
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CommitmentInputs {
    /// Weekly capacity of the person
    pub capacity: Decimal,
    /// Hours the person already committed this week
    pub allocated_this_week: Decimal,
    /// Minimums of other assignments that run at least as long
    pub reserved: Decimal,
    pub min_hours: Decimal,
    pub num_hours: Decimal,
    /// Hours worked on the assignment before the week starts
    pub worked_before_week: Decimal,
    /// Hours in every existing block of the assignment
    pub allocated_total: Decimal,
    /// Budget left on the assignment's contract
    pub contract_remaining: Decimal,
}

/// Hours to commit to one assignment this week. Never negative and never
/// more than the assignment or its contract has left.
pub fn weekly_commitment(assignment_id: Id, week: Week, inputs: &CommitmentInputs) -> Decimal {
    let week_start = week.start();

    let unallocated = inputs.capacity - inputs.allocated_this_week;
    debug!(assignment_id, %week_start, capacity = %inputs.capacity, %unallocated, "unallocated hours");

    let mut commitment = unallocated - inputs.reserved;
    debug!(assignment_id, %week_start, reserved = %inputs.reserved, %commitment, "reserved hours set aside");

    if commitment < inputs.min_hours && unallocated >= inputs.min_hours {
        commitment = inputs.min_hours;
        debug!(assignment_id, %week_start, %commitment, "raised to the weekly minimum");
    }

    let remaining = (inputs.num_hours - inputs.worked_before_week - inputs.allocated_total).max(Decimal::ZERO);
    if commitment > remaining {
        commitment = remaining;
        debug!(assignment_id, %week_start, %remaining, "capped to the assignment balance");
    }

    let contract_remaining = inputs.contract_remaining.max(Decimal::ZERO);
    if commitment > contract_remaining {
        commitment = contract_remaining;
        debug!(assignment_id, %week_start, %contract_remaining, "capped to the contract balance");
    }

    let commitment = commitment.max(Decimal::ZERO);
    debug!(assignment_id, %week_start, %commitment, "weekly commitment");
    commitment
}

/// One assignment's hours in a week state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedBlock {
    pub assignment_id: Id,
    pub hours: Decimal,
    /// Already stored before the pass
    pub existing: bool,
}

/// What a person has committed during one week
#[derive(Debug, Clone, PartialEq)]
pub struct WeekState {
    pub week: Week,
    /// In resolution order, stored blocks first
    pub blocks: Vec<PlannedBlock>,
}

impl WeekState {
    pub fn new(week: Week) -> Self {
        Self {
            week,
            blocks: Vec::new(),
        }
    }

    /// State holding the blocks already stored for the week
    pub fn from_existing(week: Week, existing: &[AssignmentAllocation]) -> Self {
        let blocks = existing
            .iter()
            .filter(|block| block.date == week.start())
            .map(|block| PlannedBlock {
                assignment_id: block.assignment_id,
                hours: block.hours,
                existing: true,
            })
            .collect();
        Self { week, blocks }
    }

    pub fn allocated(&self) -> Decimal {
        self.blocks.iter().map(|b| b.hours).sum()
    }

    pub fn is_resolved(&self, assignment_id: Id) -> bool {
        self.blocks.iter().any(|b| b.assignment_id == assignment_id)
    }

    pub fn hours_for(&self, assignment_id: Id) -> Option<Decimal> {
        self.blocks
            .iter()
            .find(|b| b.assignment_id == assignment_id)
            .map(|b| b.hours)
    }

    /// Blocks decided during the pass, not yet stored
    pub fn new_blocks(&self) -> impl Iterator<Item = &PlannedBlock> {
        self.blocks.iter().filter(|b| !b.existing)
    }

    fn with_block(mut self, assignment_id: Id, hours: Decimal) -> Self {
        self.blocks.push(PlannedBlock {
            assignment_id,
            hours,
            existing: false,
        });
        self
    }
}

/// An assignment waiting to be resolved, with the ledger figures its
/// commitment depends on. None of them change during a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub assignment: ContractAssignment,
    pub worked_before_week: Decimal,
    pub allocated_total: Decimal,
    pub contract_remaining: Decimal,
}

/// Minimum hours set aside for the person's other assignments that run at
/// least as long as `assignment` and are not resolved in `state` yet
pub fn reserved_hours(
    assignment: &ContractAssignment,
    contact_assignments: &[ContractAssignment],
    state: &WeekState,
) -> Decimal {
    contact_assignments
        .iter()
        .filter(|other| other.outlasts(assignment))
        .filter(|other| other.id.map_or(true, |id| !state.is_resolved(id)))
        .map(ContractAssignment::min_hours)
        .sum()
}

/// Commitment of `candidate` given what `state` already holds
pub fn commitment_in(
    state: &WeekState,
    candidate: &Candidate,
    contact_assignments: &[ContractAssignment],
    capacity: Decimal,
) -> Decimal {
    let assignment = &candidate.assignment;
    let inputs = CommitmentInputs {
        capacity,
        allocated_this_week: state.allocated(),
        reserved: reserved_hours(assignment, contact_assignments, state),
        min_hours: assignment.min_hours(),
        num_hours: assignment.num_hours,
        worked_before_week: candidate.worked_before_week,
        allocated_total: candidate.allocated_total,
        contract_remaining: candidate.contract_remaining,
    };
    weekly_commitment(assignment.id.unwrap_or_default(), state.week, &inputs)
}

/// Resolve `ordered` candidates one after another on top of `prior`.
/// Assignments already resolved in `prior` keep their hours.
pub fn plan_week(
    prior: WeekState,
    ordered: &[Candidate],
    contact_assignments: &[ContractAssignment],
    capacity: Decimal,
) -> WeekState {
    ordered.iter().fold(prior, |state, candidate| {
        let Some(assignment_id) = candidate.assignment.id else {
            return state;
        };
        if state.is_resolved(assignment_id) {
            return state;
        }
        let hours = commitment_in(&state, candidate, contact_assignments, capacity);
        state.with_block(assignment_id, hours)
    })
}

pub struct AllocatorService<S: Store> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    registry: RegistryService<S>,
    schedules: ScheduleService<S>,
}

impl<S: Store> AllocatorService<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: ScheduleConfig) -> Self {
        Self {
            registry: RegistryService::new(store.clone()),
            schedules: ScheduleService::new(store.clone(), config),
            store,
            clock,
        }
    }

    /// Hours to commit to the assignment during the week containing `day`,
    /// given the blocks its person already holds that week
    #[instrument(skip(self))]
    pub async fn weekly_commitment(&self, assignment_id: Id, day: chrono::NaiveDate) -> TpResult<Decimal> {
        let ctx = ComputationContext::from_clock(&*self.clock);
        let week = Week::containing(day);
        let assignment = self.registry.find_assignment(assignment_id).await?;
        let contact_id = assignment.contact_id;

        let existing = self.store.allocations_for_contact_week(contact_id, week.start()).await?;
        let state = WeekState::from_existing(week, &existing);
        let contact_assignments = self.registry.assignments_for_contact(contact_id).await?;
        let capacity = self.schedules.capacity(contact_id).await?;
        let candidate = self.candidate(&ctx, assignment, week).await?;

        Ok(commitment_in(&state, &candidate, &contact_assignments, capacity))
    }

    /// Resolve every assignment of the contact active during the week
    /// containing `day` and store the new blocks in one batch. Blocks that
    /// already exist are kept. Returns the stored new blocks.
    #[instrument(skip(self))]
    pub async fn allocate_week(&self, contact_id: Id, day: chrono::NaiveDate) -> TpResult<Vec<AssignmentAllocation>> {
        let ctx = ComputationContext::from_clock(&*self.clock);
        let week = Week::containing(day);

        let existing = self.store.allocations_for_contact_week(contact_id, week.start()).await?;
        let prior = WeekState::from_existing(week, &existing);
        let contact_assignments = self.registry.assignments_for_contact(contact_id).await?;
        let capacity = self.schedules.capacity(contact_id).await?;

        let mut ordered = Vec::new();
        for assignment in self.registry.active_during_week(contact_id, week).await? {
            if assignment.id.is_some_and(|id| prior.is_resolved(id)) {
                continue;
            }
            ordered.push(self.candidate(&ctx, assignment, week).await?);
        }

        let state = plan_week(prior, &ordered, &contact_assignments, capacity);
        let blocks = state
            .new_blocks()
            .map(|b| NewAllocation::new(b.assignment_id, week, b.hours).into_allocation())
            .collect::<Vec<_>>();
        if blocks.is_empty() {
            info!(contact_id, %week, "nothing to allocate");
            return Ok(blocks);
        }

        for block in &blocks {
            AllocationContract.validate(block)?;
        }
        let saved = self.store.save_allocations(&blocks).await?;
        info!(
            contact_id,
            %week,
            blocks = saved.len(),
            allocated = %state.allocated(),
            capacity = %capacity,
            "week allocated"
        );
        Ok(saved)
    }

    /// Hours per remaining contract week the assignment needs to finish on time
    #[instrument(skip(self))]
    pub async fn average_weekly_commitment(&self, assignment_id: Id) -> TpResult<Decimal> {
        let ctx = ComputationContext::from_clock(&*self.clock);
        let assignment = self.registry.find_assignment(assignment_id).await?;
        let contract = self.registry.contract_of(&assignment).await?;

        let weeks = self.registry.contract_weeks_remaining(&ctx, &contract).len();
        if weeks == 0 {
            return Err(TpError::NoWeeksRemaining {
                contract_id: assignment.contract_id,
            });
        }

        let worked = self
            .registry
            .assignment_hours_worked_before(&ctx, &assignment, ctx.current_week().start())
            .await?;
        let average = (assignment.num_hours - worked) / Decimal::from(weeks as u64);
        Ok(average.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    async fn candidate(
        &self,
        ctx: &ComputationContext,
        assignment: ContractAssignment,
        week: Week,
    ) -> TpResult<Candidate> {
        let contract = self.registry.contract_of(&assignment).await?;
        Ok(Candidate {
            worked_before_week: self
                .registry
                .assignment_hours_worked_before(ctx, &assignment, week.start())
                .await?,
            allocated_total: self.registry.assignment_hours_allocated(ctx, &assignment).await?,
            contract_remaining: self.registry.contract_hours_remaining(ctx, &contract).await?,
            assignment,
        })
    }
}
