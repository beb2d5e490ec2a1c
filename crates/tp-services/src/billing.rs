//! Billing window service
//!
//! Repeat periods own a gapless sequence of billing windows. The first
//! window is seeded explicitly; afterwards windows are only ever appended,
//! up to a boundary date.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use tp_contracts::{BillingWindowContract, Contract, RepeatPeriodContract};
use tp_core::clock::Clock;
use tp_core::error::TpError;
use tp_core::result::{ServiceResult, TpResult};
use tp_core::traits::{Entity, Id};
use tp_core::types::midnight;
use tp_db::{EntryFilter, Store};
use tp_models::{BillingWindow, PersonRepeatPeriod, RepeatPeriod, TimeEntry};

use crate::base::validate_and_persist;

pub struct BillingService<S: Store> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: Store> BillingService<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    #[instrument(skip(self, period), fields(period = %period))]
    pub async fn create_period(&self, period: RepeatPeriod) -> ServiceResult<RepeatPeriod> {
        let store = &*self.store;
        validate_and_persist(&RepeatPeriodContract, period, |period| async move {
            store.insert_period(&period).await
        })
        .await
    }

    pub async fn find_period(&self, period_id: Id) -> TpResult<RepeatPeriod> {
        self.store
            .find_period(period_id)
            .await?
            .ok_or_else(|| TpError::not_found(RepeatPeriod::TYPE_NAME, period_id))
    }

    /// Insert the first window `[date, date + one period)` of a period
    /// that has none yet
    #[instrument(skip(self))]
    pub async fn seed_window(&self, period_id: Id, date: NaiveDate) -> ServiceResult<BillingWindow> {
        self.try_seed_window(period_id, date).await.into()
    }

    async fn try_seed_window(&self, period_id: Id, date: NaiveDate) -> TpResult<BillingWindow> {
        let period = self.find_period(period_id).await?;
        if self.store.latest_window(period_id).await?.is_some() {
            return Err(TpError::Conflict {
                message: format!("repeat period {} already has billing windows", period_id),
            });
        }

        let window = period
            .seed_window(period_id, date)
            .ok_or_else(|| TpError::Internal(format!("{} can't start on {}", period, date)))?;
        BillingWindowContract::new().validate(&window)?;

        let mut inserted = self.store.insert_windows(&[window]).await?;
        let window = inserted
            .pop()
            .ok_or_else(|| TpError::Internal("seeding wrote no window".into()))?;
        info!(period_id, window = %window, "billing window seeded");
        Ok(window)
    }

    /// Append windows after the latest one while the next start is no later
    /// than `boundary` (default today). Returns the new windows in order; a
    /// period without windows gets none.
    #[instrument(skip(self))]
    pub async fn extend_windows(
        &self,
        period_id: Id,
        boundary: Option<NaiveDate>,
    ) -> TpResult<Vec<BillingWindow>> {
        let period = self.find_period(period_id).await?;
        let boundary = boundary.unwrap_or_else(|| self.clock.today());

        let Some(latest) = self.store.latest_window(period_id).await? else {
            debug!(period_id, "no seed window, nothing to extend");
            return Ok(Vec::new());
        };

        let planned = period.plan_windows(&latest, boundary);
        if planned.is_empty() {
            return Ok(planned);
        }

        let mut previous = &latest;
        for window in &planned {
            BillingWindowContract::following(previous).validate(window)?;
            previous = window;
        }

        let created = self.store.insert_windows(&planned).await?;
        info!(period_id, created = created.len(), %boundary, "billing windows extended");
        Ok(created)
    }

    /// Extend every active period up to `boundary` (default today)
    #[instrument(skip(self))]
    pub async fn update_active_periods(&self, boundary: Option<NaiveDate>) -> TpResult<Vec<BillingWindow>> {
        let boundary = boundary.unwrap_or_else(|| self.clock.today());
        let mut created = Vec::new();

        for period in self.store.active_periods().await? {
            let Some(period_id) = period.id else {
                continue;
            };
            created.extend(self.extend_windows(period_id, Some(boundary)).await?);
        }

        info!(created = created.len(), "active repeat periods updated");
        Ok(created)
    }

    pub async fn next_window(&self, window: &BillingWindow) -> TpResult<Option<BillingWindow>> {
        Ok(self.store.window_after(window).await?)
    }

    pub async fn previous_window(&self, window: &BillingWindow) -> TpResult<Option<BillingWindow>> {
        Ok(self.store.window_before(window).await?)
    }

    /// Entries ending inside the window, optionally for one user only
    pub async fn entries_in_window(
        &self,
        window: &BillingWindow,
        user_id: Option<Id>,
    ) -> TpResult<Vec<TimeEntry>> {
        Ok(self.store.find_entries(&window_filter(window, user_id)).await?)
    }

    pub async fn hours_in_window(&self, window: &BillingWindow, user_id: Option<Id>) -> TpResult<Decimal> {
        Ok(self.store.sum_hours(&window_filter(window, user_id)).await?)
    }

    /// Bill a person on `period_id`. A person belongs to one period at most.
    #[instrument(skip(self))]
    pub async fn link_person(&self, contact_id: Id, period_id: Id) -> TpResult<PersonRepeatPeriod> {
        self.find_period(period_id).await?;
        let link = self.store.link_person(contact_id, period_id).await?;
        info!(contact_id, period_id, "person linked to repeat period");
        Ok(link)
    }
}

/// `end > window.date` and `end <= window.end_date`
fn window_filter(window: &BillingWindow, user_id: Option<Id>) -> EntryFilter {
    let filter = match user_id {
        Some(user_id) => EntryFilter::for_user(user_id),
        None => EntryFilter::new(),
    };
    filter
        .ended_after(midnight(window.date))
        .ended_on_or_before(midnight(window.end_date))
}
