//! Allocation block storage

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::FromRow;
use tp_core::traits::Id;
use tp_models::AssignmentAllocation;

use crate::pg::PgStore;
use crate::repository::{StoreError, StoreResult};
use crate::store::AllocationStore;

#[derive(Debug, Clone, FromRow)]
pub struct AllocationRow {
    pub id: i64,
    pub assignment_id: i64,
    pub date: NaiveDate,
    pub hours: Decimal,
}

impl From<AllocationRow> for AssignmentAllocation {
    fn from(row: AllocationRow) -> Self {
        AssignmentAllocation {
            id: Some(row.id),
            assignment_id: row.assignment_id,
            date: row.date,
            hours: row.hours,
        }
    }
}

#[async_trait]
impl AllocationStore for PgStore {
    async fn insert_allocation(&self, block: &AssignmentAllocation) -> StoreResult<AssignmentAllocation> {
        let row = sqlx::query_as::<_, AllocationRow>(
            r#"
            INSERT INTO assignment_allocations (assignment_id, date, hours)
            VALUES ($1, $2, $3)
            RETURNING id, assignment_id, date, hours
            "#,
        )
        .bind(block.assignment_id)
        .bind(block.date)
        .bind(block.hours)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            StoreError::from_insert(
                e,
                format!("assignment {} already has a block for {}", block.assignment_id, block.date),
            )
        })?;

        Ok(row.into())
    }

    async fn save_allocations(&self, blocks: &[AssignmentAllocation]) -> StoreResult<Vec<AssignmentAllocation>> {
        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(blocks.len());

        for block in blocks {
            let row = sqlx::query_as::<_, AllocationRow>(
                r#"
                INSERT INTO assignment_allocations (assignment_id, date, hours)
                VALUES ($1, $2, $3)
                ON CONFLICT (assignment_id, date) DO UPDATE SET hours = EXCLUDED.hours
                RETURNING id, assignment_id, date, hours
                "#,
            )
            .bind(block.assignment_id)
            .bind(block.date)
            .bind(block.hours)
            .fetch_one(&mut *tx)
            .await?;
            saved.push(row.into());
        }

        tx.commit().await?;
        tracing::info!(blocks = saved.len(), "allocation blocks saved");
        Ok(saved)
    }

    async fn allocations_for_assignment(&self, assignment_id: Id) -> StoreResult<Vec<AssignmentAllocation>> {
        let rows = sqlx::query_as::<_, AllocationRow>(
            r#"
            SELECT id, assignment_id, date, hours
            FROM assignment_allocations
            WHERE assignment_id = $1
            ORDER BY date
            "#,
        )
        .bind(assignment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn allocations_for_contact_week(
        &self,
        contact_id: Id,
        week_start: NaiveDate,
    ) -> StoreResult<Vec<AssignmentAllocation>> {
        let rows = sqlx::query_as::<_, AllocationRow>(
            r#"
            SELECT b.id, b.assignment_id, b.date, b.hours
            FROM assignment_allocations b
            JOIN contract_assignments a ON a.id = b.assignment_id
            WHERE a.contact_id = $1 AND b.date = $2
            ORDER BY b.id
            "#,
        )
        .bind(contact_id)
        .bind(week_start)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn sum_allocated_for_contract(&self, contract_id: Id) -> StoreResult<Decimal> {
        let total = sqlx::query_scalar::<_, Option<Decimal>>(
            r#"
            SELECT SUM(b.hours)
            FROM assignment_allocations b
            JOIN contract_assignments a ON a.id = b.assignment_id
            WHERE a.contract_id = $1
            "#,
        )
        .bind(contract_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(Decimal::ZERO))
    }
}
