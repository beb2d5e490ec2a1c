//! Person schedule storage

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::FromRow;
use tp_core::traits::Id;
use tp_models::PersonSchedule;

use crate::pg::PgStore;
use crate::repository::StoreResult;
use crate::store::ScheduleStore;

#[derive(Debug, Clone, FromRow)]
pub struct PersonScheduleRow {
    pub id: i64,
    pub contact_id: i64,
    pub hours_per_week: Decimal,
    pub end_date: NaiveDate,
}

impl From<PersonScheduleRow> for PersonSchedule {
    fn from(row: PersonScheduleRow) -> Self {
        PersonSchedule {
            id: Some(row.id),
            contact_id: row.contact_id,
            hours_per_week: row.hours_per_week,
            end_date: row.end_date,
        }
    }
}

#[async_trait]
impl ScheduleStore for PgStore {
    async fn upsert_schedule(&self, schedule: &PersonSchedule) -> StoreResult<PersonSchedule> {
        let row = sqlx::query_as::<_, PersonScheduleRow>(
            r#"
            INSERT INTO person_schedules (contact_id, hours_per_week, end_date)
            VALUES ($1, $2, $3)
            ON CONFLICT (contact_id) DO UPDATE
                SET hours_per_week = EXCLUDED.hours_per_week, end_date = EXCLUDED.end_date
            RETURNING id, contact_id, hours_per_week, end_date
            "#,
        )
        .bind(schedule.contact_id)
        .bind(schedule.hours_per_week)
        .bind(schedule.end_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn schedule_for_contact(&self, contact_id: Id) -> StoreResult<Option<PersonSchedule>> {
        let row = sqlx::query_as::<_, PersonScheduleRow>(
            "SELECT id, contact_id, hours_per_week, end_date FROM person_schedules WHERE contact_id = $1",
        )
        .bind(contact_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}
