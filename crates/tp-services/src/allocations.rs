//! Allocation block service
//!
//! Stored weekly blocks and how the hours logged in each block's week
//! compare with what was planned.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::instrument;

use tp_contracts::AllocationContract;
use tp_core::error::TpError;
use tp_core::result::{ServiceResult, TpResult};
use tp_core::traits::{Entity, Id};
use tp_core::types::Week;
use tp_db::Store;
use tp_models::{AssignmentAllocation, ContractAssignment, NewAllocation};

use crate::base::validate_and_persist;
use crate::context::{ComputationContext, Metric};
use crate::registry::RegistryService;

pub struct AllocationService<S: Store> {
    store: Arc<S>,
    registry: RegistryService<S>,
}

impl<S: Store> AllocationService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            registry: RegistryService::new(store.clone()),
            store,
        }
    }

    /// Store a single block. Fails with a conflict when the assignment
    /// already holds one for that week.
    #[instrument(skip(self, params), fields(assignment_id = params.assignment_id))]
    pub async fn create_block(&self, params: NewAllocation) -> ServiceResult<AssignmentAllocation> {
        if let Err(err) = self.registry.find_assignment(params.assignment_id).await {
            return Err::<AssignmentAllocation, _>(err).into();
        }

        let store = &*self.store;
        validate_and_persist(&AllocationContract, params.into_allocation(), |block| async move {
            store.insert_allocation(&block).await
        })
        .await
    }

    pub async fn blocks_for_assignment(&self, assignment_id: Id) -> TpResult<Vec<AssignmentAllocation>> {
        Ok(self.store.allocations_for_assignment(assignment_id).await?)
    }

    /// Non-empty blocks of the contact for the week containing `day`
    pub async fn blocks_during_week(&self, contact_id: Id, day: NaiveDate) -> TpResult<Vec<AssignmentAllocation>> {
        let week = Week::containing(day);
        let blocks = self.store.allocations_for_contact_week(contact_id, week.start()).await?;
        Ok(blocks.into_iter().filter(|b| !b.hours.is_zero()).collect())
    }

    /// Hours the assignment's person logged on it during the block's week
    pub async fn block_hours_worked(
        &self,
        ctx: &ComputationContext,
        block: &AssignmentAllocation,
    ) -> TpResult<Decimal> {
        let assignment = self.assignment_of(block).await?;
        ctx.memoize(Metric::BlockHoursWorked(block.assignment_id, block.date), || async {
            let (start, end) = block.window();
            self.registry
                .assignment_hours_worked_within_window(&assignment, start, end)
                .await
        })
        .await
    }

    /// Planned hours minus hours worked; negative when the week ran over
    pub async fn block_hours_left(&self, ctx: &ComputationContext, block: &AssignmentAllocation) -> TpResult<Decimal> {
        Ok(block.hours - self.block_hours_worked(ctx, block).await?)
    }

    async fn assignment_of(&self, block: &AssignmentAllocation) -> TpResult<ContractAssignment> {
        self.store
            .find_assignment(block.assignment_id)
            .await?
            .ok_or_else(|| TpError::not_found(ContractAssignment::TYPE_NAME, block.assignment_id))
    }
}
