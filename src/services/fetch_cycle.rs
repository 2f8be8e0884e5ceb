//! Fetch-validate cycle
//!
//! Pulls one batch of candidates from the inventory and fans out one
//! detached validation task per candidate. The cycle never waits for its
//! tasks: each is bounded by the probe timeout, and a failing candidate is
//! handed to the report limiter.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::error::Result;
use crate::inventory::InventoryClient;
use crate::models::Candidate;
use crate::proxy::Prober;
use crate::services::ReportLimiter;

/// How a single validation task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The candidate forwarded the check request
    Usable,
    /// The probe failed and the inventory was told
    Reported,
    /// The candidate could not be classified; nothing was sent anywhere
    Skipped,
}

/// Fetch-validate cycle configuration
#[derive(Clone)]
pub struct FetchCycleConfig {
    /// Candidates requested per cycle
    pub each_fetch_num: usize,
}

impl Default for FetchCycleConfig {
    fn default() -> Self {
        Self { each_fetch_num: 10 }
    }
}

/// One fetch plus fan-out of validation tasks
pub struct FetchCycle {
    inventory: Arc<dyn InventoryClient>,
    prober: Arc<dyn Prober>,
    limiter: ReportLimiter,
    config: FetchCycleConfig,
}

impl FetchCycle {
    pub fn new(
        inventory: Arc<dyn InventoryClient>,
        prober: Arc<dyn Prober>,
        limiter: ReportLimiter,
        config: FetchCycleConfig,
    ) -> Self {
        Self {
            inventory,
            prober,
            limiter,
            config,
        }
    }

    /// Fetch one batch and dispatch a validation task per candidate.
    ///
    /// Returns as soon as every task is spawned. Dropping the returned handles
    /// detaches the tasks; fetch failures spawn nothing.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<Vec<JoinHandle<ValidationOutcome>>> {
        info!("fetch proxy");

        let candidates = self.inventory.require(self.config.each_fetch_num).await?;

        let handles: Vec<_> = candidates
            .into_iter()
            .map(|candidate| self.dispatch(candidate))
            .collect();

        info!(dispatched = handles.len(), "Dispatched validation tasks");
        Ok(handles)
    }

    fn dispatch(&self, candidate: Candidate) -> JoinHandle<ValidationOutcome> {
        let inventory = self.inventory.clone();
        let prober = self.prober.clone();
        let limiter = self.limiter.clone();

        tokio::spawn(async move {
            validate(&candidate, prober.as_ref(), inventory.as_ref(), &limiter).await
        })
    }
}

/// Probe one candidate and report it if it fails
pub async fn validate(
    candidate: &Candidate,
    prober: &dyn Prober,
    inventory: &dyn InventoryClient,
    limiter: &ReportLimiter,
) -> ValidationOutcome {
    match prober.probe(candidate).await {
        Ok(()) => {
            info!(
                address = %candidate.address,
                dial_type = %candidate.dial_type,
                "Validated"
            );
            ValidationOutcome::Usable
        }
        Err(e) if e.is_classification() => {
            error!(
                address = %candidate.address,
                dial_type = %candidate.dial_type,
                "unknown dial type, return"
            );
            ValidationOutcome::Skipped
        }
        Err(e) => {
            debug!(
                address = %candidate.address,
                dial_type = %candidate.dial_type,
                error = %e,
                "proxy error"
            );
            limiter.report(inventory, candidate).await;
            ValidationOutcome::Reported
        }
    }
}
