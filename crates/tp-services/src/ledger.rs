//! Time entry ledger service
//!
//! Records entries, runs the entry timer (clock in, pause, unpause, clock
//! out) and answers "how many hours" questions over the ledger.
//!
//! Timer operations run as one atomic read-modify-write over the person's
//! open entries through [`EntryStore::mutate_open_entries`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use tp_contracts::{Contract, TimeEntryContract};
use tp_core::clock::Clock;
use tp_core::config::LedgerConfig;
use tp_core::error::TpError;
use tp_core::result::{ServiceResult, TpResult};
use tp_core::traits::{Entity, Id};
use tp_core::types::midnight;
use tp_db::{EntryFilter, OpenEntryMutation, Store, StoreError, StoreResult};
use tp_models::{BillingWindow, NewTimeEntry, TimeEntry};

use crate::base::validate_and_persist;
use crate::identity::require_user;

/// Hours of one person between two dates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Every entry, time off included
    pub total: Decimal,
    pub billable: Decimal,
    pub non_billable: Decimal,
    /// Hours per time-off role (vacation, sick, ...)
    pub roles: BTreeMap<String, Decimal>,
}

/// Hours logged during one billing window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowTotal {
    pub window: BillingWindow,
    pub hours: Decimal,
}

pub struct LedgerService<S: Store> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
    contract: TimeEntryContract,
}

impl<S: Store> LedgerService<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: LedgerConfig) -> Self {
        Self {
            store,
            clock,
            config,
            contract: TimeEntryContract::new(),
        }
    }

    /// Validate and store a new entry. Hours are derived from the timestamps.
    #[instrument(skip(self, params), fields(user_id = params.user_id, project_id = params.project_id))]
    pub async fn record_entry(&self, params: NewTimeEntry) -> ServiceResult<TimeEntry> {
        let entry = params.into_entry(self.clock.now());
        let store = &*self.store;

        let result = validate_and_persist(&self.contract, entry, |entry| async move {
            store.insert_entry(&entry).await
        })
        .await;

        if let Some(entry) = result.result() {
            info!(entry_id = ?entry.id, hours = %entry.hours, "time entry recorded");
        }
        result
    }

    #[instrument(skip(self, entry), fields(entry_id = ?entry.id))]
    pub async fn update_entry(&self, entry: TimeEntry) -> ServiceResult<TimeEntry> {
        let store = &*self.store;
        validate_and_persist(&self.contract, entry, |entry| async move {
            store.update_entry(&entry).await
        })
        .await
    }

    pub async fn find_entry(&self, entry_id: Id) -> TpResult<TimeEntry> {
        self.store
            .find_entry(entry_id)
            .await?
            .ok_or_else(|| TpError::not_found(TimeEntry::TYPE_NAME, entry_id))
    }

    /// Sum of hours over the entries `filter` selects, zero when none match
    pub async fn hours_worked(&self, filter: &EntryFilter) -> TpResult<Decimal> {
        Ok(self.store.sum_hours(filter).await?)
    }

    /// Entries of `user_id` that count as work: time-off projects excluded
    pub fn worked_filter(&self, user_id: Id) -> EntryFilter {
        EntryFilter::for_user(user_id).excluding_projects(self.config.non_billable_projects.project_ids())
    }

    #[instrument(skip(self))]
    pub async fn pause(&self, entry_id: Id) -> TpResult<TimeEntry> {
        self.run_timer(entry_id, pause_in).await
    }

    /// Resume a paused entry; every other open entry of the person is paused
    #[instrument(skip(self))]
    pub async fn unpause(&self, entry_id: Id) -> TpResult<TimeEntry> {
        self.run_timer(entry_id, unpause_in).await
    }

    #[instrument(skip(self))]
    pub async fn toggle_pause(&self, entry_id: Id) -> TpResult<TimeEntry> {
        self.run_timer(entry_id, toggle_in).await
    }

    async fn run_timer(
        &self,
        entry_id: Id,
        apply: fn(&mut Vec<TimeEntry>, Id, DateTime<Utc>) -> StoreResult<()>,
    ) -> TpResult<TimeEntry> {
        let entry = self.find_entry(entry_id).await?;
        if entry.is_closed() {
            return Err(TpError::Conflict {
                message: format!("entry {} is already closed", entry_id),
            });
        }

        let now = self.clock.now();
        let mutation: OpenEntryMutation =
            Box::new(move |open: &mut Vec<TimeEntry>| apply(open, entry_id, now));
        let written = self.store.mutate_open_entries(entry.user_id, mutation).await?;
        debug!(entry_id, written = written.len(), "timer updated");

        pick_written(written, Some(entry_id))
    }

    /// Start a running entry, pausing whatever else the person has open
    #[instrument(skip(self, params), fields(user_id = params.user_id, project_id = params.project_id))]
    pub async fn clock_in(&self, params: NewTimeEntry) -> ServiceResult<TimeEntry> {
        let now = self.clock.now();
        let entry = params.into_entry(now);

        if entry.is_closed() {
            return ServiceResult::failure_with_message("a running entry can't have an end time");
        }
        if let Err(errors) = self.contract.validate(&entry) {
            return ServiceResult::failure(errors);
        }

        let user_id = entry.user_id;
        let mutation: OpenEntryMutation = Box::new(move |open: &mut Vec<TimeEntry>| {
            for other in open.iter_mut() {
                other.pause(now);
            }
            open.push(entry);
            Ok(())
        });

        let result = match self.store.mutate_open_entries(user_id, mutation).await {
            Ok(written) => pick_written(written, None),
            Err(err) => Err(err.into()),
        };
        if let Ok(entry) = &result {
            info!(entry_id = ?entry.id, "clocked in");
        }
        result.into()
    }

    /// Close an open entry at `end` (default now), resuming it first if paused
    #[instrument(skip(self))]
    pub async fn clock_out(&self, entry_id: Id, end: Option<DateTime<Utc>>) -> ServiceResult<TimeEntry> {
        let entry = match self.find_entry(entry_id).await {
            Ok(entry) => entry,
            Err(err) => return Err::<TimeEntry, _>(err).into(),
        };
        if entry.is_closed() {
            return ServiceResult::failure_with_message(format!("entry {} is already closed", entry_id));
        }

        let at = end.unwrap_or_else(|| self.clock.now());
        let mut closed = entry.clone();
        closed.close(at);
        if let Err(errors) = self.contract.validate(&closed) {
            return ServiceResult::failure(errors);
        }

        let mutation: OpenEntryMutation = Box::new(move |open: &mut Vec<TimeEntry>| {
            open.retain(|e| e.id == Some(entry_id));
            let target = open.first_mut().ok_or_else(|| missing(entry_id))?;
            target.close(at);
            Ok(())
        });

        let result = match self.store.mutate_open_entries(entry.user_id, mutation).await {
            Ok(written) => pick_written(written, Some(entry_id)),
            Err(err) => Err(err.into()),
        };
        if let Ok(entry) = &result {
            info!(entry_id, hours = %entry.hours, "clocked out");
        }
        result.into()
    }

    pub async fn has_open_entry(&self, user_id: Id) -> TpResult<bool> {
        Ok(!self.store.open_entries(user_id).await?.is_empty())
    }

    /// What everyone else is working on right now
    pub async fn active_entries(&self, excluding_user_id: Id) -> TpResult<Vec<TimeEntry>> {
        Ok(self.store.active_entries_except(excluding_user_id).await?)
    }

    /// Whether the closed `entry` shares time with other entries of its
    /// person. `None` for open entries.
    pub async fn check_overlap(&self, entry: &TimeEntry) -> TpResult<Option<bool>> {
        let Some(end) = entry.end_time else {
            return Ok(None);
        };
        let neighbours = self
            .store
            .entries_intersecting(entry.user_id, entry.start_time, end)
            .await?;
        Ok(entry.detect_overlap(&neighbours))
    }

    /// Open entries are always editable. A closed entry stays editable until
    /// the configured number of days after its billing window ends. Lookup
    /// failures leave the entry editable.
    pub async fn is_editable(&self, entry: &TimeEntry) -> bool {
        let Some(end) = entry.end_time else {
            return true;
        };

        match self.billing_window_of(entry.user_id, end.date_naive()).await {
            Ok(Some(window)) => window
                .end_date
                .checked_add_signed(Duration::days(self.config.timesheet_editable_days))
                .map_or(true, |last_day| last_day >= self.clock.today()),
            Ok(None) => true,
            Err(err) => {
                warn!(entry_id = ?entry.id, error = %err, "billing window lookup failed, entry left editable");
                true
            }
        }
    }

    async fn billing_window_of(&self, user_id: Id, day: NaiveDate) -> TpResult<Option<BillingWindow>> {
        let Some(contact_id) = self.store.contact_for_user(user_id).await? else {
            return Ok(None);
        };
        let Some(link) = self.store.period_for_contact(contact_id).await? else {
            return Ok(None);
        };
        Ok(self.store.window_containing(link.repeat_period_id, day).await?)
    }

    /// Hours of a person over entries ending after `from` and no later than `to`
    #[instrument(skip(self))]
    pub async fn summary(&self, contact_id: Id, from: NaiveDate, to: NaiveDate) -> TpResult<PeriodSummary> {
        let user_id = require_user(&*self.store, contact_id).await?;
        let base = EntryFilter::for_user(user_id)
            .ended_after(midnight(from))
            .ended_on_or_before(midnight(to));
        let worked = base
            .clone()
            .excluding_projects(self.config.non_billable_projects.project_ids());

        let total = self.store.sum_hours(&base).await?;
        let billable = self.store.sum_hours(&worked.clone().billable(true)).await?;
        let non_billable = self.store.sum_hours(&worked.billable(false)).await?;

        let mut roles = BTreeMap::new();
        for (role, project_id) in self.config.non_billable_projects.roles() {
            let hours = self.store.sum_hours(&base.clone().project(project_id)).await?;
            roles.insert(role.to_string(), hours);
        }

        Ok(PeriodSummary {
            from,
            to,
            total,
            billable,
            non_billable,
            roles,
        })
    }

    /// Totals of the person's latest `count` billing windows, newest first.
    /// Empty when the person has no repeat period.
    #[instrument(skip(self))]
    pub async fn list_total_hours(&self, contact_id: Id, count: usize) -> TpResult<Vec<WindowTotal>> {
        let user_id = require_user(&*self.store, contact_id).await?;
        let Some(link) = self.store.period_for_contact(contact_id).await? else {
            debug!(contact_id, "no repeat period linked");
            return Ok(Vec::new());
        };

        let windows = self.store.latest_windows(link.repeat_period_id, count).await?;
        let mut totals = Vec::with_capacity(windows.len());
        for window in windows {
            let filter = EntryFilter::for_user(user_id)
                .ended_after(midnight(window.date))
                .ended_on_or_before(midnight(window.end_date));
            let hours = self.store.sum_hours(&filter).await?;
            totals.push(WindowTotal { window, hours });
        }
        Ok(totals)
    }
}

/// The written entry with `id`, or the last written one when `id` is unset
fn pick_written(mut written: Vec<TimeEntry>, id: Option<Id>) -> TpResult<TimeEntry> {
    let picked = match id {
        Some(id) => written.into_iter().find(|e| e.id == Some(id)),
        None => written.pop(),
    };
    picked.ok_or_else(|| TpError::Internal("timer update wrote no entry".into()))
}

fn missing(entry_id: Id) -> StoreError {
    StoreError::not_found(TimeEntry::TYPE_NAME, entry_id)
}

/// Keep only the target and pause it
fn pause_in(open: &mut Vec<TimeEntry>, entry_id: Id, at: DateTime<Utc>) -> StoreResult<()> {
    open.retain(|e| e.id == Some(entry_id));
    let target = open.first_mut().ok_or_else(|| missing(entry_id))?;
    target.pause(at);
    Ok(())
}

/// Pause every other open entry, then resume the target. Nothing changes
/// when the target is running.
fn unpause_in(open: &mut Vec<TimeEntry>, entry_id: Id, at: DateTime<Utc>) -> StoreResult<()> {
    let target = open
        .iter()
        .find(|e| e.id == Some(entry_id))
        .ok_or_else(|| missing(entry_id))?;

    if !target.is_paused() {
        open.retain(|e| e.id == Some(entry_id));
        return Ok(());
    }

    for entry in open.iter_mut() {
        if entry.id == Some(entry_id) {
            entry.unpause(at);
        } else {
            entry.pause(at);
        }
    }
    Ok(())
}

fn toggle_in(open: &mut Vec<TimeEntry>, entry_id: Id, at: DateTime<Utc>) -> StoreResult<()> {
    let paused = open
        .iter()
        .find(|e| e.id == Some(entry_id))
        .map(TimeEntry::is_paused)
        .ok_or_else(|| missing(entry_id))?;

    if paused {
        unpause_in(open, entry_id, at)
    } else {
        pause_in(open, entry_id, at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, clock_at, date, hours, log_hours};
    use tp_core::config::NonBillableProjects;
    use tp_db::{BillingStore, EntryStore, MemoryStore};
    use tp_models::{RepeatInterval, RepeatPeriod};

    const USER: Id = 10;
    const CONTACT: Id = 1;
    const VACATION: Id = 90;
    const SICK: Id = 91;

    fn config() -> LedgerConfig {
        LedgerConfig {
            non_billable_projects: NonBillableProjects::new()
                .with_role(NonBillableProjects::VACATION, VACATION)
                .with_role(NonBillableProjects::SICK, SICK),
            timesheet_editable_days: 3,
        }
    }

    fn ledger(store: &Arc<MemoryStore>, now: DateTime<Utc>) -> LedgerService<MemoryStore> {
        LedgerService::new(store.clone(), clock_at(now), config())
    }

    fn monday() -> NaiveDate {
        date(2024, 5, 13)
    }

    #[tokio::test]
    async fn test_record_entry_derives_hours() {
        let store = Arc::new(MemoryStore::new());
        let service = ledger(&store, at(monday(), 18, 0));

        let params = NewTimeEntry::new(USER, 2, 3)
            .starting(at(monday(), 9, 0))
            .ending(at(monday(), 11, 30))
            .paused_for(1800);
        let entry = service.record_entry(params).await.into_result().unwrap();

        assert!(entry.id.is_some());
        assert_eq!(entry.hours, hours(2));
    }

    #[tokio::test]
    async fn test_record_entry_rejects_excess_pause() {
        let store = Arc::new(MemoryStore::new());
        let service = ledger(&store, at(monday(), 18, 0));

        let params = NewTimeEntry::new(USER, 2, 3)
            .starting(at(monday(), 9, 0))
            .ending(at(monday(), 10, 0))
            .paused_for(7200);
        let result = service.record_entry(params).await;

        assert!(result.is_failure());
        assert!(result.errors().has_error("seconds_paused"));
        assert!(store.find_entries(&EntryFilter::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hours_worked_over_empty_set_is_zero() {
        let store = Arc::new(MemoryStore::new());
        let service = ledger(&store, at(monday(), 18, 0));

        let total = service.hours_worked(&service.worked_filter(USER)).await.unwrap();
        assert_eq!(total, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_worked_filter_excludes_time_off() {
        let store = Arc::new(MemoryStore::new());
        log_hours(&store, USER, 2, monday(), 6).await;
        log_hours(&store, USER, VACATION, date(2024, 5, 14), 8).await;
        let service = ledger(&store, at(monday(), 18, 0));

        let worked = service.hours_worked(&service.worked_filter(USER)).await.unwrap();
        assert_eq!(worked, hours(6));
    }

    #[tokio::test]
    async fn test_clock_in_pauses_other_open_entries() {
        let store = Arc::new(MemoryStore::new());
        let first = store
            .insert_entry(&TimeEntry::open(USER, 2, 3, at(monday(), 9, 0)))
            .await
            .unwrap();
        let service = ledger(&store, at(monday(), 10, 0));

        let second = service
            .clock_in(NewTimeEntry::new(USER, 4, 3))
            .await
            .into_result()
            .unwrap();

        assert_eq!(second.start_time, at(monday(), 10, 0));
        assert!(!second.is_paused());
        let first = store.find_entry(first.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(first.pause_time, Some(at(monday(), 10, 0)));
        assert!(service.has_open_entry(USER).await.unwrap());
    }

    #[tokio::test]
    async fn test_clock_in_rejects_closed_entry() {
        let store = Arc::new(MemoryStore::new());
        let service = ledger(&store, at(monday(), 10, 0));

        let params = NewTimeEntry::new(USER, 2, 3)
            .starting(at(monday(), 9, 0))
            .ending(at(monday(), 10, 0));
        assert!(service.clock_in(params).await.is_failure());
        assert!(!service.has_open_entry(USER).await.unwrap());
    }

    #[tokio::test]
    async fn test_pause_is_a_noop_when_paused() {
        let store = Arc::new(MemoryStore::new());
        let entry = store
            .insert_entry(&TimeEntry::open(USER, 2, 3, at(monday(), 9, 0)))
            .await
            .unwrap();
        let id = entry.id.unwrap();

        ledger(&store, at(monday(), 10, 0)).pause(id).await.unwrap();
        let again = ledger(&store, at(monday(), 11, 0)).pause(id).await.unwrap();

        assert_eq!(again.pause_time, Some(at(monday(), 10, 0)));
    }

    #[tokio::test]
    async fn test_unpause_accumulates_and_pauses_others() {
        let store = Arc::new(MemoryStore::new());
        let mut paused = TimeEntry::open(USER, 2, 3, at(monday(), 9, 0));
        paused.pause_time = Some(at(monday(), 10, 0));
        let paused = store.insert_entry(&paused).await.unwrap();
        let running = store
            .insert_entry(&TimeEntry::open(USER, 4, 3, at(monday(), 10, 0)))
            .await
            .unwrap();

        let service = ledger(&store, at(monday(), 10, 30));
        let resumed = service.unpause(paused.id.unwrap()).await.unwrap();

        assert!(!resumed.is_paused());
        assert_eq!(resumed.seconds_paused, 1800);
        let running = store.find_entry(running.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(running.pause_time, Some(at(monday(), 10, 30)));
    }

    #[tokio::test]
    async fn test_unpause_is_a_noop_when_running() {
        let store = Arc::new(MemoryStore::new());
        let entry = store
            .insert_entry(&TimeEntry::open(USER, 2, 3, at(monday(), 9, 0)))
            .await
            .unwrap();
        let other = store
            .insert_entry(&TimeEntry::open(USER, 4, 3, at(monday(), 9, 30)))
            .await
            .unwrap();

        let service = ledger(&store, at(monday(), 10, 0));
        let same = service.unpause(entry.id.unwrap()).await.unwrap();

        assert_eq!(same.seconds_paused, 0);
        let other = store.find_entry(other.id.unwrap()).await.unwrap().unwrap();
        assert!(!other.is_paused());
    }

    #[tokio::test]
    async fn test_toggle_pause_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let entry = store
            .insert_entry(&TimeEntry::open(USER, 2, 3, at(monday(), 9, 0)))
            .await
            .unwrap();
        let id = entry.id.unwrap();

        let paused = ledger(&store, at(monday(), 10, 0)).toggle_pause(id).await.unwrap();
        assert!(paused.is_paused());

        let resumed = ledger(&store, at(monday(), 10, 15)).toggle_pause(id).await.unwrap();
        assert!(!resumed.is_paused());
        assert_eq!(resumed.seconds_paused, 900);
    }

    #[tokio::test]
    async fn test_timer_on_closed_entry_conflicts() {
        let store = Arc::new(MemoryStore::new());
        let entry = log_hours(&store, USER, 2, monday(), 2).await;

        let err = ledger(&store, at(monday(), 18, 0))
            .pause(entry.id.unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "conflict");
    }

    #[tokio::test]
    async fn test_clock_out_resumes_and_closes() {
        let store = Arc::new(MemoryStore::new());
        let mut entry = TimeEntry::open(USER, 2, 3, at(monday(), 9, 0));
        entry.pause_time = Some(at(monday(), 11, 0));
        let entry = store.insert_entry(&entry).await.unwrap();

        let service = ledger(&store, at(monday(), 12, 0));
        let closed = service
            .clock_out(entry.id.unwrap(), None)
            .await
            .into_result()
            .unwrap();

        assert_eq!(closed.end_time, Some(at(monday(), 12, 0)));
        assert_eq!(closed.seconds_paused, 3600);
        assert_eq!(closed.hours, hours(2));
        assert!(!service.has_open_entry(USER).await.unwrap());
    }

    #[tokio::test]
    async fn test_clock_out_before_start_fails() {
        let store = Arc::new(MemoryStore::new());
        let entry = store
            .insert_entry(&TimeEntry::open(USER, 2, 3, at(monday(), 9, 0)))
            .await
            .unwrap();

        let service = ledger(&store, at(monday(), 12, 0));
        let result = service
            .clock_out(entry.id.unwrap(), Some(at(monday(), 8, 0)))
            .await;

        assert!(result.is_failure());
        assert!(service.has_open_entry(USER).await.unwrap());
    }

    #[tokio::test]
    async fn test_active_entries_skip_the_caller() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_entry(&TimeEntry::open(USER, 2, 3, at(monday(), 9, 0)))
            .await
            .unwrap();
        store
            .insert_entry(&TimeEntry::open(11, 2, 3, at(monday(), 9, 0)))
            .await
            .unwrap();

        let active = ledger(&store, at(monday(), 10, 0)).active_entries(USER).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].user_id, 11);
    }

    #[tokio::test]
    async fn test_check_overlap() {
        let store = Arc::new(MemoryStore::new());
        log_hours(&store, USER, 2, monday(), 3).await;
        let service = ledger(&store, at(monday(), 18, 0));

        let mut overlapping = TimeEntry::open(USER, 4, 3, at(monday(), 10, 0));
        overlapping.end_time = Some(at(monday(), 11, 0));
        assert_eq!(service.check_overlap(&overlapping).await.unwrap(), Some(true));

        let mut later = TimeEntry::open(USER, 4, 3, at(monday(), 13, 0));
        later.end_time = Some(at(monday(), 14, 0));
        assert_eq!(service.check_overlap(&later).await.unwrap(), Some(false));

        let open = TimeEntry::open(USER, 4, 3, at(monday(), 13, 0));
        assert_eq!(service.check_overlap(&open).await.unwrap(), None);
    }

    async fn link_weekly_period(store: &MemoryStore) {
        store.link_contact(CONTACT, USER).await;
        let period = store
            .insert_period(&RepeatPeriod::new(1, RepeatInterval::Week))
            .await
            .unwrap();
        let period_id = period.id.unwrap();
        store
            .insert_windows(&[BillingWindow::new(period_id, monday(), date(2024, 5, 20))])
            .await
            .unwrap();
        store.link_person(CONTACT, period_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_is_editable_within_grace_days() {
        let store = Arc::new(MemoryStore::new());
        link_weekly_period(&store).await;
        let entry = log_hours(&store, USER, 2, date(2024, 5, 15), 2).await;

        assert!(ledger(&store, at(date(2024, 5, 23), 9, 0)).is_editable(&entry).await);
        assert!(!ledger(&store, at(date(2024, 5, 24), 9, 0)).is_editable(&entry).await);
    }

    #[tokio::test]
    async fn test_is_editable_without_window() {
        let store = Arc::new(MemoryStore::new());
        link_weekly_period(&store).await;
        let entry = log_hours(&store, USER, 2, date(2024, 6, 3), 2).await;
        let open = TimeEntry::open(USER, 2, 3, at(monday(), 9, 0));

        let service = ledger(&store, at(date(2025, 1, 1), 9, 0));
        assert!(service.is_editable(&entry).await);
        assert!(service.is_editable(&open).await);
    }

    #[tokio::test]
    async fn test_summary_splits_hours() {
        let store = Arc::new(MemoryStore::new());
        store.link_contact(CONTACT, USER).await;
        log_hours(&store, USER, 2, monday(), 5).await;
        let mut internal = log_hours(&store, USER, 3, date(2024, 5, 14), 2).await;
        internal.billable = false;
        store.update_entry(&internal).await.unwrap();
        log_hours(&store, USER, VACATION, date(2024, 5, 15), 8).await;
        log_hours(&store, USER, SICK, date(2024, 5, 16), 4).await;
        log_hours(&store, USER, 2, date(2024, 5, 21), 7).await;

        let summary = ledger(&store, at(date(2024, 5, 25), 9, 0))
            .summary(CONTACT, monday(), date(2024, 5, 20))
            .await
            .unwrap();

        assert_eq!(summary.total, hours(19));
        assert_eq!(summary.billable, hours(5));
        assert_eq!(summary.non_billable, hours(2));
        assert_eq!(summary.roles.get("vacation"), Some(&hours(8)));
        assert_eq!(summary.roles.get("sick"), Some(&hours(4)));
    }

    #[tokio::test]
    async fn test_list_total_hours() {
        let store = Arc::new(MemoryStore::new());
        link_weekly_period(&store).await;
        let period_id = store.period_for_contact(CONTACT).await.unwrap().unwrap().repeat_period_id;
        store
            .insert_windows(&[BillingWindow::new(period_id, date(2024, 5, 20), date(2024, 5, 27))])
            .await
            .unwrap();
        log_hours(&store, USER, 2, monday(), 3).await;
        log_hours(&store, USER, 2, date(2024, 5, 21), 5).await;

        let totals = ledger(&store, at(date(2024, 5, 28), 9, 0))
            .list_total_hours(CONTACT, 5)
            .await
            .unwrap();

        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].window.date, date(2024, 5, 20));
        assert_eq!(totals[0].hours, hours(5));
        assert_eq!(totals[1].hours, hours(3));
    }

    #[tokio::test]
    async fn test_list_total_hours_without_period() {
        let store = Arc::new(MemoryStore::new());
        store.link_contact(CONTACT, USER).await;

        let totals = ledger(&store, at(monday(), 9, 0)).list_total_hours(CONTACT, 3).await.unwrap();
        assert!(totals.is_empty());
    }
}
