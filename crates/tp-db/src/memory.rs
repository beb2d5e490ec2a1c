//! In-memory store
//!
//! Backs the service tests and single-process runs. Each table sits behind
//! its own `RwLock`; multi-table reads take the locks in declaration order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tp_core::traits::{Entity, Id};
use tp_models::{
    AssignmentAllocation, BillingWindow, ContractAssignment, PersonRepeatPeriod, PersonSchedule,
    ProjectContract, RepeatPeriod, TimeEntry,
};

use crate::repository::{EntryFilter, StoreError, StoreResult};
use crate::store::{
    AllocationStore, BillingStore, ContractStore, EntryStore, IdentityProvider, OpenEntryMutation,
    ScheduleStore,
};

pub struct MemoryStore {
    entries: RwLock<Vec<TimeEntry>>,
    periods: RwLock<Vec<RepeatPeriod>>,
    windows: RwLock<Vec<BillingWindow>>,
    person_periods: RwLock<Vec<PersonRepeatPeriod>>,
    contracts: RwLock<Vec<ProjectContract>>,
    assignments: RwLock<Vec<ContractAssignment>>,
    allocations: RwLock<Vec<AssignmentAllocation>>,
    schedules: RwLock<Vec<PersonSchedule>>,
    contacts: RwLock<HashMap<Id, Id>>,
    next_id: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            periods: RwLock::new(Vec::new()),
            windows: RwLock::new(Vec::new()),
            person_periods: RwLock::new(Vec::new()),
            contracts: RwLock::new(Vec::new()),
            assignments: RwLock::new(Vec::new()),
            allocations: RwLock::new(Vec::new()),
            schedules: RwLock::new(Vec::new()),
            contacts: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn next_id(&self) -> Id {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Record that `contact_id` logs time as `user_id`
    pub async fn link_contact(&self, contact_id: Id, user_id: Id) {
        self.contacts.write().await.insert(contact_id, user_id);
    }

    fn stamp_new(&self, entry: &mut TimeEntry, now: DateTime<Utc>) {
        entry.id = Some(self.next_id());
        entry.created_at = Some(now);
        entry.updated_at = Some(now);
        entry.refresh_hours();
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn insert_entry(&self, entry: &TimeEntry) -> StoreResult<TimeEntry> {
        let mut stored = entry.clone();
        self.stamp_new(&mut stored, Utc::now());

        self.entries.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn update_entry(&self, entry: &TimeEntry) -> StoreResult<TimeEntry> {
        let id = entry.id.ok_or(StoreError::not_found(TimeEntry::TYPE_NAME, 0))?;
        let mut entries = self.entries.write().await;
        let slot = entries
            .iter_mut()
            .find(|e| e.id == Some(id))
            .ok_or(StoreError::not_found(TimeEntry::TYPE_NAME, id))?;

        let mut stored = entry.clone();
        stored.created_at = slot.created_at;
        stored.updated_at = Some(Utc::now());
        stored.refresh_hours();
        *slot = stored.clone();
        Ok(stored)
    }

    async fn find_entry(&self, id: Id) -> StoreResult<Option<TimeEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.iter().find(|e| e.id == Some(id)).cloned())
    }

    async fn find_entries(&self, filter: &EntryFilter) -> StoreResult<Vec<TimeEntry>> {
        let entries = self.entries.read().await;
        let mut found: Vec<TimeEntry> = entries.iter().filter(|e| filter.matches(e)).cloned().collect();
        found.sort_by_key(|e| (e.start_time, e.id));
        Ok(found)
    }

    async fn sum_hours(&self, filter: &EntryFilter) -> StoreResult<Decimal> {
        let entries = self.entries.read().await;
        Ok(entries.iter().filter(|e| filter.matches(e)).map(|e| e.hours).sum())
    }

    async fn entries_intersecting(
        &self,
        user_id: Id,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<TimeEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.user_id == user_id && e.intersects(start, end))
            .cloned()
            .collect())
    }

    async fn open_entries(&self, user_id: Id) -> StoreResult<Vec<TimeEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.user_id == user_id && e.is_open())
            .cloned()
            .collect())
    }

    async fn active_entries_except(&self, user_id: Id) -> StoreResult<Vec<TimeEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.user_id != user_id && e.is_open())
            .cloned()
            .collect())
    }

    async fn mutate_open_entries(
        &self,
        user_id: Id,
        mutation: OpenEntryMutation,
    ) -> StoreResult<Vec<TimeEntry>> {
        // held until every change is written back
        let mut entries = self.entries.write().await;

        let mut open: Vec<TimeEntry> = entries
            .iter()
            .filter(|e| e.user_id == user_id && e.is_open())
            .cloned()
            .collect();
        mutation(&mut open)?;

        for entry in &open {
            if let Some(id) = entry.id {
                if !entries.iter().any(|e| e.id == Some(id)) {
                    return Err(StoreError::not_found(TimeEntry::TYPE_NAME, id));
                }
            }
        }

        let now = Utc::now();
        for entry in open.iter_mut() {
            match entry.id {
                Some(id) => {
                    entry.updated_at = Some(now);
                    entry.refresh_hours();
                    if let Some(slot) = entries.iter_mut().find(|e| e.id == Some(id)) {
                        *slot = entry.clone();
                    }
                }
                None => {
                    self.stamp_new(entry, now);
                    entries.push(entry.clone());
                }
            }
        }
        Ok(open)
    }
}

#[async_trait]
impl BillingStore for MemoryStore {
    async fn insert_period(&self, period: &RepeatPeriod) -> StoreResult<RepeatPeriod> {
        let mut stored = period.clone();
        stored.id = Some(self.next_id());
        self.periods.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn find_period(&self, id: Id) -> StoreResult<Option<RepeatPeriod>> {
        let periods = self.periods.read().await;
        Ok(periods.iter().find(|p| p.id == Some(id)).cloned())
    }

    async fn active_periods(&self) -> StoreResult<Vec<RepeatPeriod>> {
        let periods = self.periods.read().await;
        Ok(periods.iter().filter(|p| p.active).cloned().collect())
    }

    async fn latest_window(&self, period_id: Id) -> StoreResult<Option<BillingWindow>> {
        let windows = self.windows.read().await;
        Ok(windows
            .iter()
            .filter(|w| w.period_id == period_id)
            .max_by_key(|w| w.date)
            .cloned())
    }

    async fn insert_windows(&self, windows: &[BillingWindow]) -> StoreResult<Vec<BillingWindow>> {
        let mut stored_windows = self.windows.write().await;
        let mut inserted = Vec::with_capacity(windows.len());
        for window in windows {
            if stored_windows
                .iter()
                .any(|w| w.period_id == window.period_id && w.date == window.date)
            {
                return Err(StoreError::Conflict(format!(
                    "period {} already has a window starting {}",
                    window.period_id, window.date
                )));
            }
            let mut stored = window.clone();
            stored.id = Some(self.next_id());
            inserted.push(stored);
        }
        stored_windows.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn latest_windows(&self, period_id: Id, limit: usize) -> StoreResult<Vec<BillingWindow>> {
        let windows = self.windows.read().await;
        let mut found: Vec<BillingWindow> =
            windows.iter().filter(|w| w.period_id == period_id).cloned().collect();
        found.sort_by(|a, b| b.date.cmp(&a.date));
        found.truncate(limit);
        Ok(found)
    }

    async fn window_after(&self, window: &BillingWindow) -> StoreResult<Option<BillingWindow>> {
        let windows = self.windows.read().await;
        Ok(windows
            .iter()
            .filter(|w| w.period_id == window.period_id && w.date > window.date)
            .min_by_key(|w| w.date)
            .cloned())
    }

    async fn window_before(&self, window: &BillingWindow) -> StoreResult<Option<BillingWindow>> {
        let windows = self.windows.read().await;
        Ok(windows
            .iter()
            .filter(|w| w.period_id == window.period_id && w.date < window.date)
            .max_by_key(|w| w.date)
            .cloned())
    }

    async fn window_containing(&self, period_id: Id, day: NaiveDate) -> StoreResult<Option<BillingWindow>> {
        let windows = self.windows.read().await;
        Ok(windows
            .iter()
            .find(|w| w.period_id == period_id && w.contains(day))
            .cloned())
    }

    async fn link_person(&self, contact_id: Id, period_id: Id) -> StoreResult<PersonRepeatPeriod> {
        let mut links = self.person_periods.write().await;
        if links
            .iter()
            .any(|l| l.contact_id == contact_id || l.repeat_period_id == period_id)
        {
            return Err(StoreError::Conflict(format!(
                "contact {} or period {} is already linked",
                contact_id, period_id
            )));
        }
        let link = PersonRepeatPeriod {
            id: Some(self.next_id()),
            contact_id,
            repeat_period_id: period_id,
        };
        links.push(link.clone());
        Ok(link)
    }

    async fn period_for_contact(&self, contact_id: Id) -> StoreResult<Option<PersonRepeatPeriod>> {
        let links = self.person_periods.read().await;
        Ok(links.iter().find(|l| l.contact_id == contact_id).cloned())
    }
}

#[async_trait]
impl ContractStore for MemoryStore {
    async fn insert_contract(&self, contract: &ProjectContract) -> StoreResult<ProjectContract> {
        let mut stored = contract.clone();
        stored.id = Some(self.next_id());
        self.contracts.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn find_contract(&self, id: Id) -> StoreResult<Option<ProjectContract>> {
        let contracts = self.contracts.read().await;
        Ok(contracts.iter().find(|c| c.id == Some(id)).cloned())
    }

    async fn insert_assignment(&self, assignment: &ContractAssignment) -> StoreResult<ContractAssignment> {
        let mut assignments = self.assignments.write().await;
        if assignments
            .iter()
            .any(|a| a.contract_id == assignment.contract_id && a.contact_id == assignment.contact_id)
        {
            return Err(StoreError::Conflict(format!(
                "contact {} is already assigned to contract {}",
                assignment.contact_id, assignment.contract_id
            )));
        }
        let mut stored = assignment.clone();
        stored.id = Some(self.next_id());
        assignments.push(stored.clone());
        Ok(stored)
    }

    async fn find_assignment(&self, id: Id) -> StoreResult<Option<ContractAssignment>> {
        let assignments = self.assignments.read().await;
        Ok(assignments.iter().find(|a| a.id == Some(id)).cloned())
    }

    async fn assignments_for_contract(&self, contract_id: Id) -> StoreResult<Vec<ContractAssignment>> {
        let assignments = self.assignments.read().await;
        Ok(assignments
            .iter()
            .filter(|a| a.contract_id == contract_id)
            .cloned()
            .collect())
    }

    async fn assignments_for_contact(&self, contact_id: Id) -> StoreResult<Vec<ContractAssignment>> {
        let assignments = self.assignments.read().await;
        Ok(assignments
            .iter()
            .filter(|a| a.contact_id == contact_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AllocationStore for MemoryStore {
    async fn insert_allocation(&self, block: &AssignmentAllocation) -> StoreResult<AssignmentAllocation> {
        let mut allocations = self.allocations.write().await;
        if allocations
            .iter()
            .any(|b| b.assignment_id == block.assignment_id && b.date == block.date)
        {
            return Err(StoreError::Conflict(format!(
                "assignment {} already has a block for {}",
                block.assignment_id, block.date
            )));
        }
        let mut stored = block.clone();
        stored.id = Some(self.next_id());
        allocations.push(stored.clone());
        Ok(stored)
    }

    async fn save_allocations(&self, blocks: &[AssignmentAllocation]) -> StoreResult<Vec<AssignmentAllocation>> {
        let mut allocations = self.allocations.write().await;
        let mut saved = Vec::with_capacity(blocks.len());
        for block in blocks {
            let existing = allocations
                .iter_mut()
                .find(|b| b.assignment_id == block.assignment_id && b.date == block.date);
            match existing {
                Some(slot) => {
                    slot.hours = block.hours;
                    saved.push(slot.clone());
                }
                None => {
                    let mut stored = block.clone();
                    stored.id = Some(self.next_id());
                    allocations.push(stored.clone());
                    saved.push(stored);
                }
            }
        }
        Ok(saved)
    }

    async fn allocations_for_assignment(&self, assignment_id: Id) -> StoreResult<Vec<AssignmentAllocation>> {
        let allocations = self.allocations.read().await;
        let mut found: Vec<AssignmentAllocation> = allocations
            .iter()
            .filter(|b| b.assignment_id == assignment_id)
            .cloned()
            .collect();
        found.sort_by_key(|b| b.date);
        Ok(found)
    }

    async fn allocations_for_contact_week(
        &self,
        contact_id: Id,
        week_start: NaiveDate,
    ) -> StoreResult<Vec<AssignmentAllocation>> {
        let assignments = self.assignments.read().await;
        let allocations = self.allocations.read().await;
        let ids: Vec<Id> = assignments
            .iter()
            .filter(|a| a.contact_id == contact_id)
            .filter_map(|a| a.id)
            .collect();
        Ok(allocations
            .iter()
            .filter(|b| b.date == week_start && ids.contains(&b.assignment_id))
            .cloned()
            .collect())
    }

    async fn sum_allocated_for_contract(&self, contract_id: Id) -> StoreResult<Decimal> {
        let assignments = self.assignments.read().await;
        let allocations = self.allocations.read().await;
        let ids: Vec<Id> = assignments
            .iter()
            .filter(|a| a.contract_id == contract_id)
            .filter_map(|a| a.id)
            .collect();
        Ok(allocations
            .iter()
            .filter(|b| ids.contains(&b.assignment_id))
            .map(|b| b.hours)
            .sum())
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn upsert_schedule(&self, schedule: &PersonSchedule) -> StoreResult<PersonSchedule> {
        let mut schedules = self.schedules.write().await;
        if let Some(slot) = schedules.iter_mut().find(|s| s.contact_id == schedule.contact_id) {
            slot.hours_per_week = schedule.hours_per_week;
            slot.end_date = schedule.end_date;
            return Ok(slot.clone());
        }
        let mut stored = schedule.clone();
        stored.id = Some(self.next_id());
        schedules.push(stored.clone());
        Ok(stored)
    }

    async fn schedule_for_contact(&self, contact_id: Id) -> StoreResult<Option<PersonSchedule>> {
        let schedules = self.schedules.read().await;
        Ok(schedules.iter().find(|s| s.contact_id == contact_id).cloned())
    }
}

#[async_trait]
impl IdentityProvider for MemoryStore {
    async fn user_for_contact(&self, contact_id: Id) -> StoreResult<Option<Id>> {
        Ok(self.contacts.read().await.get(&contact_id).copied())
    }

    async fn contact_for_user(&self, user_id: Id) -> StoreResult<Option<Id>> {
        let contacts = self.contacts.read().await;
        Ok(contacts
            .iter()
            .find(|(_, user)| **user == user_id)
            .map(|(contact, _)| *contact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tp_core::types::Week;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, h, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_insert_recomputes_hours() {
        let store = MemoryStore::new();
        let mut entry = TimeEntry::open(1, 2, 3, at(13, 9));
        entry.end_time = Some(at(13, 11));
        entry.hours = Decimal::from(99);

        let stored = store.insert_entry(&entry).await.unwrap();
        assert!(stored.id.is_some());
        assert_eq!(stored.hours, Decimal::from(2));

        let sum = store.sum_hours(&EntryFilter::for_user(1)).await.unwrap();
        assert_eq!(sum, Decimal::from(2));
        assert_eq!(store.sum_hours(&EntryFilter::for_user(7)).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_mutate_open_entries_inserts_and_updates() {
        let store = MemoryStore::new();
        let first = store.insert_entry(&TimeEntry::open(1, 2, 3, at(13, 9))).await.unwrap();

        let written = store
            .mutate_open_entries(
                1,
                Box::new(move |open: &mut Vec<TimeEntry>| {
                    for entry in open.iter_mut() {
                        entry.pause(at(13, 10));
                    }
                    open.push(TimeEntry::open(1, 4, 3, at(13, 10)));
                    Ok(())
                }),
            )
            .await
            .unwrap();

        assert_eq!(written.len(), 2);
        let reloaded = store.find_entry(first.id.unwrap()).await.unwrap().unwrap();
        assert!(reloaded.is_paused());
        assert_eq!(store.open_entries(1).await.unwrap().len(), 2);
        assert!(store.active_entries_except(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_mutation_writes_nothing() {
        let store = MemoryStore::new();
        let first = store.insert_entry(&TimeEntry::open(1, 2, 3, at(13, 9))).await.unwrap();

        let result = store
            .mutate_open_entries(
                1,
                Box::new(move |open: &mut Vec<TimeEntry>| {
                    open[0].pause(at(13, 10));
                    Err(StoreError::Validation("rejected".into()))
                }),
            )
            .await;

        assert!(result.is_err());
        let reloaded = store.find_entry(first.id.unwrap()).await.unwrap().unwrap();
        assert!(!reloaded.is_paused());
    }

    #[tokio::test]
    async fn test_allocation_uniqueness() {
        let store = MemoryStore::new();
        let week = Week::containing(date(2024, 5, 13));
        let block = AssignmentAllocation {
            id: None,
            assignment_id: 5,
            date: week.start(),
            hours: Decimal::from(10),
        };

        store.insert_allocation(&block).await.unwrap();
        assert!(matches!(
            store.insert_allocation(&block).await,
            Err(StoreError::Conflict(_))
        ));

        let mut update = block.clone();
        update.hours = Decimal::from(12);
        let saved = store.save_allocations(&[update]).await.unwrap();
        assert_eq!(saved[0].hours, Decimal::from(12));
        assert_eq!(store.allocations_for_assignment(5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_window_navigation() {
        let store = MemoryStore::new();
        let windows = store
            .insert_windows(&[
                BillingWindow::new(1, date(2024, 1, 1), date(2024, 1, 15)),
                BillingWindow::new(1, date(2024, 1, 15), date(2024, 1, 29)),
                BillingWindow::new(2, date(2024, 1, 1), date(2024, 2, 1)),
            ])
            .await
            .unwrap();

        let next = store.window_after(&windows[0]).await.unwrap().unwrap();
        assert_eq!(next.date, date(2024, 1, 15));
        assert!(store.window_after(&windows[1]).await.unwrap().is_none());
        assert_eq!(
            store.window_before(&windows[1]).await.unwrap().map(|w| w.date),
            Some(date(2024, 1, 1))
        );
        assert_eq!(
            store.latest_window(1).await.unwrap().map(|w| w.date),
            Some(date(2024, 1, 15))
        );
        assert_eq!(
            store.window_containing(1, date(2024, 1, 20)).await.unwrap().map(|w| w.date),
            Some(date(2024, 1, 15))
        );
        assert_eq!(store.latest_windows(1, 5).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_person_period_links_are_unique() {
        let store = MemoryStore::new();
        store.link_person(1, 10).await.unwrap();
        assert!(store.link_person(1, 11).await.is_err());
        assert!(store.link_person(2, 10).await.is_err());
        assert_eq!(
            store.period_for_contact(1).await.unwrap().map(|l| l.repeat_period_id),
            Some(10)
        );
    }

    #[tokio::test]
    async fn test_identity_mapping() {
        let store = MemoryStore::new();
        store.link_contact(3, 30).await;
        assert_eq!(store.user_for_contact(3).await.unwrap(), Some(30));
        assert_eq!(store.contact_for_user(30).await.unwrap(), Some(3));
        assert_eq!(store.user_for_contact(4).await.unwrap(), None);
    }
}
