//! Weekly and monthly overtime
//!
//! Overtime is worked time above a weekly threshold. Time off (vacation,
//! sick, ...) never counts as worked time.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use tp_core::config::NonBillableProjects;
use tp_core::result::TpResult;
use tp_core::traits::Id;
use tp_core::types::{weeks_in_month, Week};
use tp_db::{EntryFilter, Store};

use crate::identity::require_user;

pub struct OvertimeService<S: Store> {
    store: Arc<S>,
    non_billable: NonBillableProjects,
    threshold: Decimal,
}

impl<S: Store> OvertimeService<S> {
    pub fn new(store: Arc<S>, non_billable: NonBillableProjects, threshold: Decimal) -> Self {
        Self {
            store,
            non_billable,
            threshold,
        }
    }

    /// Worked hours of the contact's entries ending inside the week
    /// containing `day`
    pub async fn hours_in_week(&self, contact_id: Id, day: NaiveDate) -> TpResult<Decimal> {
        let user_id = require_user(&*self.store, contact_id).await?;
        let (start, next_start) = Week::containing(day).window();
        let filter = EntryFilter::for_user(user_id)
            .excluding_projects(self.non_billable.project_ids())
            .ended_after(start)
            .ended_before(next_start);
        Ok(self.store.sum_hours(&filter).await?)
    }

    pub async fn overtime_hours_in_week(&self, contact_id: Id, day: NaiveDate) -> TpResult<Decimal> {
        let worked = self.hours_in_week(contact_id, day).await?;
        Ok((worked - self.threshold).max(Decimal::ZERO))
    }

    /// Overtime summed over every week that shares a day with `day`'s month
    #[instrument(skip(self))]
    pub async fn total_monthly_overtime(&self, contact_id: Id, day: NaiveDate) -> TpResult<Decimal> {
        let mut total = Decimal::ZERO;
        for week in weeks_in_month(day) {
            let overtime = self.overtime_hours_in_week(contact_id, week.start()).await?;
            if !overtime.is_zero() {
                debug!(contact_id, %week, %overtime, "overtime week");
            }
            total += overtime;
        }
        Ok(total)
    }
}
