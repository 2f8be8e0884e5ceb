//! Admission gate for failure reports
//!
//! Probes run unbounded; only the report calls back to the inventory are
//! gated, by a fixed budget shared across every validation task. A report
//! that finds the budget exhausted waits for a unit rather than being dropped.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use crate::inventory::InventoryClient;
use crate::models::Candidate;

/// Bounded gate in front of the inventory's report endpoint
#[derive(Clone)]
pub struct ReportLimiter {
    budget: Arc<Semaphore>,
    capacity: usize,
}

impl ReportLimiter {
    /// Create a limiter allowing `capacity` reports in flight (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            budget: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Configured budget size
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Units not currently held by a report
    pub fn available(&self) -> usize {
        self.budget.available_permits()
    }

    /// Report a failed candidate once a budget unit is free.
    ///
    /// The unit is held only for the duration of the single report call and
    /// released whether or not the call succeeds.
    #[instrument(skip(self, inventory, candidate), fields(id = candidate.id, provider = %candidate.provider))]
    pub async fn report(&self, inventory: &dyn InventoryClient, candidate: &Candidate) {
        let _permit = match self.budget.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Report budget closed, dropping report");
                return;
            }
        };

        debug!(available = self.available(), "Acquired report budget");

        if let Err(e) = inventory.report(candidate).await {
            warn!(error = %e, "Failed to send report http request");
        }
    }
}
