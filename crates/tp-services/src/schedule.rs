//! Person schedule service
//!
//! Weekly capacity and availability horizon of a person.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use tp_contracts::ScheduleContract;
use tp_core::config::ScheduleConfig;
use tp_core::result::{ServiceResult, TpResult};
use tp_core::traits::Id;
use tp_db::Store;
use tp_models::PersonSchedule;

use crate::base::validate_and_persist;
use crate::context::ComputationContext;
use crate::registry::RegistryService;

pub struct ScheduleService<S: Store> {
    store: Arc<S>,
    registry: RegistryService<S>,
    config: ScheduleConfig,
}

impl<S: Store> ScheduleService<S> {
    pub fn new(store: Arc<S>, config: ScheduleConfig) -> Self {
        Self {
            registry: RegistryService::new(store.clone()),
            store,
            config,
        }
    }

    /// Create or replace the contact's schedule
    #[instrument(skip(self, schedule), fields(contact_id = schedule.contact_id))]
    pub async fn set_schedule(&self, schedule: PersonSchedule) -> ServiceResult<PersonSchedule> {
        let store = &*self.store;
        validate_and_persist(&ScheduleContract, schedule, |schedule| async move {
            store.upsert_schedule(&schedule).await
        })
        .await
    }

    pub async fn schedule_for(&self, contact_id: Id) -> TpResult<Option<PersonSchedule>> {
        Ok(self.store.schedule_for_contact(contact_id).await?)
    }

    /// Hours per week the person can work; the configured default without a
    /// schedule
    pub async fn capacity(&self, contact_id: Id) -> TpResult<Decimal> {
        match self.schedule_for(contact_id).await? {
            Some(schedule) => Ok(schedule.hours_per_week),
            None => {
                debug!(contact_id, default = %self.config.default_hours_per_week, "no schedule, default capacity");
                Ok(self.config.default_hours_per_week)
            }
        }
    }

    /// Latest end date among the person's assignments on contracts that are
    /// not complete, else the schedule's own end date
    pub async fn furthest_end_date(&self, contact_id: Id) -> TpResult<Option<NaiveDate>> {
        let mut furthest: Option<NaiveDate> = None;
        for assignment in self.registry.assignments_for_contact(contact_id).await? {
            let contract = self.registry.contract_of(&assignment).await?;
            if contract.is_complete() {
                continue;
            }
            furthest = furthest.max(Some(assignment.end_date));
        }

        match furthest {
            Some(end_date) => Ok(Some(end_date)),
            None => Ok(self.schedule_for(contact_id).await?.map(|s| s.end_date)),
        }
    }

    /// Capacity left between today and the schedule's end date; zero without
    /// a schedule
    pub async fn hours_available(&self, ctx: &ComputationContext, contact_id: Id) -> TpResult<Decimal> {
        Ok(self
            .schedule_for(contact_id)
            .await?
            .map_or(Decimal::ZERO, |schedule| schedule.hours_available(ctx.today())))
    }

    /// Hours still owed on the person's assignments that have not ended
    pub async fn hours_scheduled(&self, ctx: &ComputationContext, contact_id: Id) -> TpResult<Decimal> {
        let mut scheduled = Decimal::ZERO;
        for assignment in self.registry.assignments_for_contact(contact_id).await? {
            if assignment.end_date >= ctx.today() {
                scheduled += self.registry.assignment_hours_remaining(ctx, &assignment).await?;
            }
        }
        Ok(scheduled)
    }
}
