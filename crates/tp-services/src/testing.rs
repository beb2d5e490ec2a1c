//! Shared test fixtures

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use mockall::mock;
use rust_decimal::Decimal;
use tp_core::clock::Clock;
use tp_core::traits::Id;
use tp_db::{ContractStore, EntryStore, MemoryStore};
use tp_models::{ContractAssignment, ContractStatus, ProjectContract, TimeEntry};

mock! {
    pub WallClock {}

    impl Clock for WallClock {
        fn now(&self) -> DateTime<Utc>;
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(day: NaiveDate, h: u32, m: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_hms_opt(h, m, 0).unwrap())
}

pub fn hours(value: i64) -> Decimal {
    Decimal::from(value)
}

/// A clock that always reads `now`
pub fn clock_at(now: DateTime<Utc>) -> Arc<dyn Clock> {
    let mut clock = MockWallClock::new();
    clock.expect_now().return_const(now);
    Arc::new(clock)
}

/// Insert a closed entry of `hours_worked` whole hours starting at 09:00 on `day`
pub async fn log_hours(store: &MemoryStore, user_id: Id, project_id: Id, day: NaiveDate, hours_worked: u32) -> TimeEntry {
    let mut entry = TimeEntry::open(user_id, project_id, 1, at(day, 9, 0));
    entry.end_time = Some(at(day, 9 + hours_worked, 0));
    store.insert_entry(&entry).await.unwrap()
}

pub async fn add_contract(
    store: &MemoryStore,
    project_id: Id,
    start: NaiveDate,
    end: NaiveDate,
    num_hours: i64,
) -> ProjectContract {
    let contract = ProjectContract {
        id: None,
        project_id,
        start_date: start,
        end_date: end,
        num_hours: hours(num_hours),
        status: ContractStatus::Current,
    };
    store.insert_contract(&contract).await.unwrap()
}

pub async fn add_assignment(
    store: &MemoryStore,
    contract: &ProjectContract,
    contact_id: Id,
    end: NaiveDate,
    num_hours: i64,
    min_hours_per_week: i32,
) -> ContractAssignment {
    let assignment = ContractAssignment {
        id: None,
        contract_id: contract.id.unwrap(),
        contact_id,
        start_date: contract.start_date,
        end_date: end,
        num_hours: hours(num_hours),
        min_hours_per_week,
    };
    store.insert_assignment(&assignment).await.unwrap()
}
