//! Time entry storage

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use tp_core::traits::{Entity, Id};
use tp_models::TimeEntry;

use crate::pg::PgStore;
use crate::repository::{EntryFilter, StoreError, StoreResult};
use crate::store::{EntryStore, OpenEntryMutation};

const ENTRY_COLUMNS: &str = "id, user_id, project_id, activity_id, location_id, start_time, end_time, \
     seconds_paused, pause_time, comments, hours, billable, created_at, updated_at";

/// Time entry database row
#[derive(Debug, Clone, FromRow)]
pub struct TimeEntryRow {
    pub id: i64,
    pub user_id: i64,
    pub project_id: i64,
    pub activity_id: Option<i64>,
    pub location_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub seconds_paused: i64,
    pub pause_time: Option<DateTime<Utc>>,
    pub comments: String,
    pub hours: Decimal,
    pub billable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TimeEntryRow> for TimeEntry {
    fn from(row: TimeEntryRow) -> Self {
        TimeEntry {
            id: Some(row.id),
            user_id: row.user_id,
            project_id: row.project_id,
            activity_id: row.activity_id,
            location_id: row.location_id,
            start_time: row.start_time,
            end_time: row.end_time,
            seconds_paused: row.seconds_paused,
            pause_time: row.pause_time,
            comments: row.comments,
            hours: row.hours,
            billable: row.billable,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &EntryFilter) {
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(project_id) = filter.project_id {
        builder.push(" AND project_id = ").push_bind(project_id);
    }
    if !filter.exclude_project_ids.is_empty() {
        builder
            .push(" AND NOT (project_id = ANY(")
            .push_bind(filter.exclude_project_ids.clone())
            .push("))");
    }
    if let Some(billable) = filter.billable {
        builder.push(" AND billable = ").push_bind(billable);
    }
    if let Some(at) = filter.started_on_or_after {
        builder.push(" AND start_time >= ").push_bind(at);
    }
    // comparisons against NULL end_time are never true
    if let Some(at) = filter.ended_before {
        builder.push(" AND end_time < ").push_bind(at);
    }
    if let Some(at) = filter.ended_after {
        builder.push(" AND end_time > ").push_bind(at);
    }
    if let Some(at) = filter.ended_on_or_before {
        builder.push(" AND end_time <= ").push_bind(at);
    }
}

async fn insert_row(conn: &mut PgConnection, entry: &TimeEntry) -> Result<TimeEntryRow, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO time_entries (
            user_id, project_id, activity_id, location_id, start_time, end_time,
            seconds_paused, pause_time, comments, hours, billable, created_at, updated_at
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW()
        )
        RETURNING {}
        "#,
        ENTRY_COLUMNS
    );

    sqlx::query_as::<_, TimeEntryRow>(&sql)
        .bind(entry.user_id)
        .bind(entry.project_id)
        .bind(entry.activity_id)
        .bind(entry.location_id)
        .bind(entry.start_time)
        .bind(entry.end_time)
        .bind(entry.seconds_paused)
        .bind(entry.pause_time)
        .bind(&entry.comments)
        .bind(entry.total_hours())
        .bind(entry.billable)
        .fetch_one(conn)
        .await
}

async fn update_row(conn: &mut PgConnection, id: Id, entry: &TimeEntry) -> StoreResult<TimeEntryRow> {
    let sql = format!(
        r#"
        UPDATE time_entries SET
            project_id = $1,
            activity_id = $2,
            location_id = $3,
            start_time = $4,
            end_time = $5,
            seconds_paused = $6,
            pause_time = $7,
            comments = $8,
            hours = $9,
            billable = $10,
            updated_at = NOW()
        WHERE id = $11
        RETURNING {}
        "#,
        ENTRY_COLUMNS
    );

    sqlx::query_as::<_, TimeEntryRow>(&sql)
        .bind(entry.project_id)
        .bind(entry.activity_id)
        .bind(entry.location_id)
        .bind(entry.start_time)
        .bind(entry.end_time)
        .bind(entry.seconds_paused)
        .bind(entry.pause_time)
        .bind(&entry.comments)
        .bind(entry.total_hours())
        .bind(entry.billable)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(StoreError::not_found(TimeEntry::TYPE_NAME, id))
}

#[async_trait]
impl EntryStore for PgStore {
    async fn insert_entry(&self, entry: &TimeEntry) -> StoreResult<TimeEntry> {
        let mut conn = self.pool.acquire().await?;
        let row = insert_row(&mut conn, entry).await?;

        tracing::debug!(entry_id = row.id, user_id = row.user_id, "time entry inserted");
        Ok(row.into())
    }

    async fn update_entry(&self, entry: &TimeEntry) -> StoreResult<TimeEntry> {
        let id = entry.id.ok_or(StoreError::not_found(TimeEntry::TYPE_NAME, 0))?;
        let mut conn = self.pool.acquire().await?;
        let row = update_row(&mut conn, id, entry).await?;
        Ok(row.into())
    }

    async fn find_entry(&self, id: Id) -> StoreResult<Option<TimeEntry>> {
        let sql = format!("SELECT {} FROM time_entries WHERE id = $1", ENTRY_COLUMNS);
        let row = sqlx::query_as::<_, TimeEntryRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn find_entries(&self, filter: &EntryFilter) -> StoreResult<Vec<TimeEntry>> {
        let mut builder = QueryBuilder::new(format!("SELECT {} FROM time_entries WHERE 1=1", ENTRY_COLUMNS));
        push_filter(&mut builder, filter);
        builder.push(" ORDER BY start_time, id");

        let rows = builder
            .build_query_as::<TimeEntryRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn sum_hours(&self, filter: &EntryFilter) -> StoreResult<Decimal> {
        let mut builder = QueryBuilder::new("SELECT SUM(hours) FROM time_entries WHERE 1=1");
        push_filter(&mut builder, filter);

        let total = builder
            .build_query_scalar::<Option<Decimal>>()
            .fetch_one(&self.pool)
            .await?;

        Ok(total.unwrap_or(Decimal::ZERO))
    }

    async fn entries_intersecting(
        &self,
        user_id: Id,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<TimeEntry>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM time_entries
            WHERE user_id = $1
              AND (
                (end_time >= $2 AND end_time <= $3)
                OR (start_time >= $2 AND start_time <= $3)
                OR (start_time <= $2 AND end_time >= $3)
              )
            ORDER BY start_time, id
            "#,
            ENTRY_COLUMNS
        );

        let rows = sqlx::query_as::<_, TimeEntryRow>(&sql)
            .bind(user_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn open_entries(&self, user_id: Id) -> StoreResult<Vec<TimeEntry>> {
        let sql = format!(
            "SELECT {} FROM time_entries WHERE user_id = $1 AND end_time IS NULL ORDER BY start_time, id",
            ENTRY_COLUMNS
        );
        let rows = sqlx::query_as::<_, TimeEntryRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn active_entries_except(&self, user_id: Id) -> StoreResult<Vec<TimeEntry>> {
        let sql = format!(
            "SELECT {} FROM time_entries WHERE user_id <> $1 AND end_time IS NULL ORDER BY start_time, id",
            ENTRY_COLUMNS
        );
        let rows = sqlx::query_as::<_, TimeEntryRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn mutate_open_entries(
        &self,
        user_id: Id,
        mutation: OpenEntryMutation,
    ) -> StoreResult<Vec<TimeEntry>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {} FROM time_entries WHERE user_id = $1 AND end_time IS NULL ORDER BY start_time, id FOR UPDATE",
            ENTRY_COLUMNS
        );
        let rows = sqlx::query_as::<_, TimeEntryRow>(&sql)
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;

        let mut open: Vec<TimeEntry> = rows.into_iter().map(Into::into).collect();
        // dropping the transaction on error rolls it back
        mutation(&mut open)?;

        let mut written = Vec::with_capacity(open.len());
        for entry in &open {
            let row = match entry.id {
                Some(id) => update_row(&mut tx, id, entry).await?,
                None => insert_row(&mut tx, entry).await?,
            };
            written.push(TimeEntry::from(row));
        }

        tx.commit().await?;
        tracing::debug!(user_id, entries = written.len(), "open entries rewritten");
        Ok(written)
    }
}
