//! PostgreSQL store
//!
//! The per-table trait implementations live next to their row types in
//! `time_entries`, `billing_windows`, `contracts`, `allocations` and
//! `schedules`.

use async_trait::async_trait;
use sqlx::PgPool;
use tp_core::traits::Id;

use crate::pool::Database;
use crate::repository::StoreResult;
use crate::store::IdentityProvider;

#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn from_database(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl IdentityProvider for PgStore {
    async fn user_for_contact(&self, contact_id: Id) -> StoreResult<Option<Id>> {
        let user_id = sqlx::query_scalar::<_, Option<i64>>("SELECT user_id FROM contacts WHERE id = $1")
            .bind(contact_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user_id.flatten())
    }

    async fn contact_for_user(&self, user_id: Id) -> StoreResult<Option<Id>> {
        let contact_id = sqlx::query_scalar::<_, i64>("SELECT id FROM contacts WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(contact_id)
    }
}
