//! Repeat period and billing window storage

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::FromRow;
use tp_core::traits::Id;
use tp_models::{BillingWindow, PersonRepeatPeriod, RepeatInterval, RepeatPeriod};

use crate::pg::PgStore;
use crate::repository::{StoreError, StoreResult};
use crate::store::BillingStore;

#[derive(Debug, Clone, FromRow)]
pub struct RepeatPeriodRow {
    pub id: i64,
    pub count: i32,
    pub interval_unit: String,
    pub active: bool,
}

impl TryFrom<RepeatPeriodRow> for RepeatPeriod {
    type Error = StoreError;

    fn try_from(row: RepeatPeriodRow) -> Result<Self, Self::Error> {
        let interval = RepeatInterval::parse(&row.interval_unit).ok_or_else(|| {
            StoreError::Validation(format!("unknown repeat interval {:?}", row.interval_unit))
        })?;
        Ok(RepeatPeriod {
            id: Some(row.id),
            count: row.count.max(0) as u32,
            interval,
            active: row.active,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct BillingWindowRow {
    pub id: i64,
    pub period_id: i64,
    pub date: NaiveDate,
    pub end_date: NaiveDate,
}

impl From<BillingWindowRow> for BillingWindow {
    fn from(row: BillingWindowRow) -> Self {
        BillingWindow {
            id: Some(row.id),
            period_id: row.period_id,
            date: row.date,
            end_date: row.end_date,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PersonRepeatPeriodRow {
    pub id: i64,
    pub contact_id: i64,
    pub repeat_period_id: i64,
}

impl From<PersonRepeatPeriodRow> for PersonRepeatPeriod {
    fn from(row: PersonRepeatPeriodRow) -> Self {
        PersonRepeatPeriod {
            id: Some(row.id),
            contact_id: row.contact_id,
            repeat_period_id: row.repeat_period_id,
        }
    }
}

#[async_trait]
impl BillingStore for PgStore {
    async fn insert_period(&self, period: &RepeatPeriod) -> StoreResult<RepeatPeriod> {
        let row = sqlx::query_as::<_, RepeatPeriodRow>(
            r#"
            INSERT INTO repeat_periods (count, interval_unit, active)
            VALUES ($1, $2, $3)
            RETURNING id, count, interval_unit, active
            "#,
        )
        .bind(period.count as i32)
        .bind(period.interval.as_str())
        .bind(period.active)
        .fetch_one(&self.pool)
        .await?;

        RepeatPeriod::try_from(row)
    }

    async fn find_period(&self, id: Id) -> StoreResult<Option<RepeatPeriod>> {
        let row = sqlx::query_as::<_, RepeatPeriodRow>(
            "SELECT id, count, interval_unit, active FROM repeat_periods WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(RepeatPeriod::try_from).transpose()
    }

    async fn active_periods(&self) -> StoreResult<Vec<RepeatPeriod>> {
        let rows = sqlx::query_as::<_, RepeatPeriodRow>(
            "SELECT id, count, interval_unit, active FROM repeat_periods WHERE active ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RepeatPeriod::try_from).collect()
    }

    async fn latest_window(&self, period_id: Id) -> StoreResult<Option<BillingWindow>> {
        let row = sqlx::query_as::<_, BillingWindowRow>(
            r#"
            SELECT id, period_id, date, end_date
            FROM billing_windows
            WHERE period_id = $1
            ORDER BY date DESC
            LIMIT 1
            "#,
        )
        .bind(period_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn insert_windows(&self, windows: &[BillingWindow]) -> StoreResult<Vec<BillingWindow>> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(windows.len());

        for window in windows {
            let row = sqlx::query_as::<_, BillingWindowRow>(
                r#"
                INSERT INTO billing_windows (period_id, date, end_date)
                VALUES ($1, $2, $3)
                RETURNING id, period_id, date, end_date
                "#,
            )
            .bind(window.period_id)
            .bind(window.date)
            .bind(window.end_date)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                StoreError::from_insert(
                    e,
                    format!("period {} already has a window starting {}", window.period_id, window.date),
                )
            })?;
            inserted.push(row.into());
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn latest_windows(&self, period_id: Id, limit: usize) -> StoreResult<Vec<BillingWindow>> {
        let rows = sqlx::query_as::<_, BillingWindowRow>(
            r#"
            SELECT id, period_id, date, end_date
            FROM billing_windows
            WHERE period_id = $1
            ORDER BY date DESC
            LIMIT $2
            "#,
        )
        .bind(period_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn window_after(&self, window: &BillingWindow) -> StoreResult<Option<BillingWindow>> {
        let row = sqlx::query_as::<_, BillingWindowRow>(
            r#"
            SELECT id, period_id, date, end_date
            FROM billing_windows
            WHERE period_id = $1 AND date > $2
            ORDER BY date
            LIMIT 1
            "#,
        )
        .bind(window.period_id)
        .bind(window.date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn window_before(&self, window: &BillingWindow) -> StoreResult<Option<BillingWindow>> {
        let row = sqlx::query_as::<_, BillingWindowRow>(
            r#"
            SELECT id, period_id, date, end_date
            FROM billing_windows
            WHERE period_id = $1 AND date < $2
            ORDER BY date DESC
            LIMIT 1
            "#,
        )
        .bind(window.period_id)
        .bind(window.date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn window_containing(&self, period_id: Id, day: NaiveDate) -> StoreResult<Option<BillingWindow>> {
        let row = sqlx::query_as::<_, BillingWindowRow>(
            r#"
            SELECT id, period_id, date, end_date
            FROM billing_windows
            WHERE period_id = $1 AND date <= $2 AND end_date > $2
            ORDER BY date DESC
            LIMIT 1
            "#,
        )
        .bind(period_id)
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn link_person(&self, contact_id: Id, period_id: Id) -> StoreResult<PersonRepeatPeriod> {
        let row = sqlx::query_as::<_, PersonRepeatPeriodRow>(
            r#"
            INSERT INTO person_repeat_periods (contact_id, repeat_period_id)
            VALUES ($1, $2)
            RETURNING id, contact_id, repeat_period_id
            "#,
        )
        .bind(contact_id)
        .bind(period_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            StoreError::from_insert(
                e,
                format!("contact {} or period {} is already linked", contact_id, period_id),
            )
        })?;

        Ok(row.into())
    }

    async fn period_for_contact(&self, contact_id: Id) -> StoreResult<Option<PersonRepeatPeriod>> {
        let row = sqlx::query_as::<_, PersonRepeatPeriodRow>(
            "SELECT id, contact_id, repeat_period_id FROM person_repeat_periods WHERE contact_id = $1",
        )
        .bind(contact_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}
