//! Scheduled reconciliation sweeps.
//!
//! Both sweeps are stateless set-based updates whose predicates exclude
//! rows that already transitioned, so re-running them is harmless. They
//! run with no tenant context and intentionally span every organization.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::store::{PropertyStore, StoreError};

pub struct ReconciliationSweeper<S> {
    store: Arc<S>,
}

impl<S: PropertyStore> ReconciliationSweeper<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Ages out every ACTIVE lease whose end date has passed. Returns the
    /// number of leases moved to EXPIRED.
    pub fn expire_leases(&self, today: NaiveDate) -> Result<u64, StoreError> {
        let expired = self.store.expire_leases_ended_before(today)?;
        info!(expired, %today, "lease expiry sweep finished");
        Ok(expired)
    }

    /// Flags every PENDING payment past its due date. Returns the number of
    /// payments moved to OVERDUE.
    pub fn flag_overdue_payments(&self, today: NaiveDate) -> Result<u64, StoreError> {
        let flagged = self.store.flag_payments_due_before(today)?;
        info!(flagged, %today, "overdue payment sweep finished");
        Ok(flagged)
    }
}
