//! # tp-db
//!
//! Storage layer for Timepiece RS.
//!
//! - Store traits consumed by the services
//! - `MemoryStore`, an in-process implementation
//! - `PgStore`, a PostgreSQL implementation using SQLx
//! - Connection pool management and the table schema
//!
//! ## Example
//!
//! ```ignore
//! use tp_core::config::AppConfig;
//! use tp_db::{Database, PgStore};
//!
//! let config = AppConfig::from_env()?;
//! let db = Database::connect(&config.database).await?;
//! db.apply_schema().await?;
//!
//! let store = PgStore::from_database(&db);
//! ```

pub mod allocations;
pub mod billing_windows;
pub mod contracts;
pub mod memory;
pub mod pg;
pub mod pool;
pub mod repository;
pub mod schedules;
pub mod store;
pub mod time_entries;

pub use memory::MemoryStore;
pub use pg::PgStore;
pub use pool::Database;
pub use repository::{EntryFilter, StoreError, StoreResult};
pub use store::{
    AllocationStore, BillingStore, ContractStore, EntryStore, IdentityProvider, OpenEntryMutation,
    ScheduleStore, Store,
};
