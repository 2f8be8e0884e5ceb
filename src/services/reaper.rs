//! Dead-proxy reaper
//!
//! Deletes every stored proxy whose error count has reached the configured
//! ceiling. Each sweep is a single statement, so running it twice in a row
//! removes nothing the second time.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::repository::ProxyStore;

/// Periodic cleanup of the proxy table
pub struct Reaper {
    store: Arc<dyn ProxyStore>,
    max_err: i32,
}

impl Reaper {
    pub fn new(store: Arc<dyn ProxyStore>, max_err: i32) -> Self {
        Self { store, max_err }
    }

    pub fn max_err(&self) -> i32 {
        self.max_err
    }

    /// Remove proxies with `err_times >= max_err`, returning how many went
    #[instrument(skip(self), fields(max_err = self.max_err))]
    pub async fn sweep(&self) -> Result<usize> {
        let removed = self.store.delete_exceeding(self.max_err).await?;

        for record in &removed {
            debug!(
                id = record.id,
                address = %record.address,
                provider = %record.provider,
                err_times = record.err_times,
                "Removed dead proxy"
            );
        }

        info!(count = removed.len(), "Swept dead proxies");
        Ok(removed.len())
    }
}
