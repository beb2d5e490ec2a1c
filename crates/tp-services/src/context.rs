//! Computation context
//!
//! Derived hour figures (hours worked on a contract, on an assignment
//! before a week, on a block's week) are read many times during one
//! allocation pass. A [`ComputationContext`] pins "now" for the pass and
//! memoizes those figures keyed by metric and entity. Contexts are never
//! shared between passes, so a new pass always sees fresh ledger data.

use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tp_core::clock::Clock;
use tp_core::result::TpResult;
use tp_core::traits::Id;
use tp_core::types::Week;

/// A memoized figure and the entity it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    ContractHoursWorked(Id),
    AssignmentHoursWorked(Id),
    /// Hours worked on the assignment before the given week start
    AssignmentWorkedBefore(Id, NaiveDate),
    /// Sum of every block of the assignment
    AssignmentAllocated(Id),
    /// Hours worked on the assignment during the block's week
    BlockHoursWorked(Id, NaiveDate),
}

/// Per-pass clock reading and memo table
#[derive(Debug)]
pub struct ComputationContext {
    now: DateTime<Utc>,
    memo: Mutex<HashMap<Metric, Decimal>>,
}

impl ComputationContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_clock(clock: &dyn Clock) -> Self {
        Self::new(clock.now())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    pub fn current_week(&self) -> Week {
        Week::containing(self.today())
    }

    pub fn cached(&self, metric: Metric) -> Option<Decimal> {
        self.memo.lock().get(&metric).copied()
    }

    pub fn remember(&self, metric: Metric, value: Decimal) {
        self.memo.lock().insert(metric, value);
    }

    /// Drop a figure after a write that changes it
    pub fn forget(&self, metric: Metric) {
        self.memo.lock().remove(&metric);
    }

    pub fn len(&self) -> usize {
        self.memo.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the memoized figure or compute and remember it. The lock is
    /// not held while `compute` runs.
    pub async fn memoize<F, Fut>(&self, metric: Metric, compute: F) -> TpResult<Decimal>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = TpResult<Decimal>>,
    {
        if let Some(value) = self.cached(metric) {
            return Ok(value);
        }
        let value = compute().await?;
        self.remember(metric, value);
        Ok(value)
    }
}
