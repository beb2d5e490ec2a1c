//! Project contract and assignment storage

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::FromRow;
use tp_core::traits::Id;
use tp_models::{ContractAssignment, ContractStatus, ProjectContract};

use crate::pg::PgStore;
use crate::repository::{StoreError, StoreResult};
use crate::store::ContractStore;

#[derive(Debug, Clone, FromRow)]
pub struct ProjectContractRow {
    pub id: i64,
    pub project_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub num_hours: Decimal,
    pub status: String,
}

impl TryFrom<ProjectContractRow> for ProjectContract {
    type Error = StoreError;

    fn try_from(row: ProjectContractRow) -> Result<Self, Self::Error> {
        let status = ContractStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Validation(format!("unknown contract status {:?}", row.status)))?;
        Ok(ProjectContract {
            id: Some(row.id),
            project_id: row.project_id,
            start_date: row.start_date,
            end_date: row.end_date,
            num_hours: row.num_hours,
            status,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ContractAssignmentRow {
    pub id: i64,
    pub contract_id: i64,
    pub contact_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub num_hours: Decimal,
    pub min_hours_per_week: i32,
}

impl From<ContractAssignmentRow> for ContractAssignment {
    fn from(row: ContractAssignmentRow) -> Self {
        ContractAssignment {
            id: Some(row.id),
            contract_id: row.contract_id,
            contact_id: row.contact_id,
            start_date: row.start_date,
            end_date: row.end_date,
            num_hours: row.num_hours,
            min_hours_per_week: row.min_hours_per_week,
        }
    }
}

#[async_trait]
impl ContractStore for PgStore {
    async fn insert_contract(&self, contract: &ProjectContract) -> StoreResult<ProjectContract> {
        let row = sqlx::query_as::<_, ProjectContractRow>(
            r#"
            INSERT INTO project_contracts (project_id, start_date, end_date, num_hours, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, project_id, start_date, end_date, num_hours, status
            "#,
        )
        .bind(contract.project_id)
        .bind(contract.start_date)
        .bind(contract.end_date)
        .bind(contract.num_hours)
        .bind(contract.status.as_str())
        .fetch_one(&self.pool)
        .await?;

        ProjectContract::try_from(row)
    }

    async fn find_contract(&self, id: Id) -> StoreResult<Option<ProjectContract>> {
        let row = sqlx::query_as::<_, ProjectContractRow>(
            r#"
            SELECT id, project_id, start_date, end_date, num_hours, status
            FROM project_contracts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProjectContract::try_from).transpose()
    }

    async fn insert_assignment(&self, assignment: &ContractAssignment) -> StoreResult<ContractAssignment> {
        let row = sqlx::query_as::<_, ContractAssignmentRow>(
            r#"
            INSERT INTO contract_assignments (
                contract_id, contact_id, start_date, end_date, num_hours, min_hours_per_week
            ) VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, contract_id, contact_id, start_date, end_date, num_hours, min_hours_per_week
            "#,
        )
        .bind(assignment.contract_id)
        .bind(assignment.contact_id)
        .bind(assignment.start_date)
        .bind(assignment.end_date)
        .bind(assignment.num_hours)
        .bind(assignment.min_hours_per_week)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            StoreError::from_insert(
                e,
                format!(
                    "contact {} is already assigned to contract {}",
                    assignment.contact_id, assignment.contract_id
                ),
            )
        })?;

        Ok(row.into())
    }

    async fn find_assignment(&self, id: Id) -> StoreResult<Option<ContractAssignment>> {
        let row = sqlx::query_as::<_, ContractAssignmentRow>(
            r#"
            SELECT id, contract_id, contact_id, start_date, end_date, num_hours, min_hours_per_week
            FROM contract_assignments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn assignments_for_contract(&self, contract_id: Id) -> StoreResult<Vec<ContractAssignment>> {
        let rows = sqlx::query_as::<_, ContractAssignmentRow>(
            r#"
            SELECT id, contract_id, contact_id, start_date, end_date, num_hours, min_hours_per_week
            FROM contract_assignments
            WHERE contract_id = $1
            ORDER BY id
            "#,
        )
        .bind(contract_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn assignments_for_contact(&self, contact_id: Id) -> StoreResult<Vec<ContractAssignment>> {
        let rows = sqlx::query_as::<_, ContractAssignmentRow>(
            r#"
            SELECT id, contract_id, contact_id, start_date, end_date, num_hours, min_hours_per_week
            FROM contract_assignments
            WHERE contact_id = $1
            ORDER BY id
            "#,
        )
        .bind(contact_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
