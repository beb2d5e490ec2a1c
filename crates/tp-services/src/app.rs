//! Service bundle
//!
//! Builds every service over one store and clock from the application
//! configuration.

use std::sync::Arc;

use chrono::NaiveDate;

use tp_core::clock::Clock;
use tp_core::config::AppConfig;
use tp_db::Store;

use crate::allocations::AllocationService;
use crate::allocator::AllocatorService;
use crate::billing::BillingService;
use crate::context::ComputationContext;
use crate::ledger::LedgerService;
use crate::overtime::OvertimeService;
use crate::registry::RegistryService;
use crate::schedule::ScheduleService;

pub struct Services<S: Store> {
    clock: Arc<dyn Clock>,
    pub ledger: LedgerService<S>,
    pub billing: BillingService<S>,
    pub registry: RegistryService<S>,
    pub schedules: ScheduleService<S>,
    pub allocator: AllocatorService<S>,
    pub allocations: AllocationService<S>,
    pub overtime: OvertimeService<S>,
}

impl<S: Store> Services<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: &AppConfig) -> Self {
        Self {
            ledger: LedgerService::new(store.clone(), clock.clone(), config.ledger.clone()),
            billing: BillingService::new(store.clone(), clock.clone()),
            registry: RegistryService::new(store.clone()),
            schedules: ScheduleService::new(store.clone(), config.schedule.clone()),
            allocator: AllocatorService::new(store.clone(), clock.clone(), config.schedule.clone()),
            allocations: AllocationService::new(store.clone()),
            overtime: OvertimeService::new(
                store,
                config.ledger.non_billable_projects.clone(),
                config.schedule.overtime_threshold_hours,
            ),
            clock,
        }
    }

    /// A fresh memo for one pass of derived-hours queries
    pub fn context(&self) -> ComputationContext {
        ComputationContext::from_clock(&*self.clock)
    }

    /// Today according to the clock the services were built with
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}
