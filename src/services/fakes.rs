//! Trait fakes for exercising the services without a network or database

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{MaintainerError, Result};
use crate::inventory::InventoryClient;
use crate::models::{Candidate, ProxyRecord};
use crate::proxy::Prober;
use crate::repository::ProxyStore;

/// Inventory that serves a fixed batch and records reports
pub struct MockInventory {
    batch: Vec<Candidate>,
    require_status: Option<u16>,
    fail_reports: bool,
    report_delay: Duration,
    require_calls: AtomicUsize,
    report_attempts: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    reported: Mutex<Vec<Candidate>>,
}

impl MockInventory {
    pub fn new(batch: Vec<Candidate>) -> Self {
        Self {
            batch,
            require_status: None,
            fail_reports: false,
            report_delay: Duration::ZERO,
            require_calls: AtomicUsize::new(0),
            report_attempts: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            reported: Mutex::new(Vec::new()),
        }
    }

    /// Answer `require` with the given HTTP status instead of the batch
    pub fn with_require_status(mut self, status: u16) -> Self {
        self.require_status = Some(status);
        self
    }

    pub fn with_report_delay(mut self, delay: Duration) -> Self {
        self.report_delay = delay;
        self
    }

    pub fn failing_reports(mut self) -> Self {
        self.fail_reports = true;
        self
    }

    pub fn require_calls(&self) -> usize {
        self.require_calls.load(Ordering::SeqCst)
    }

    pub fn report_attempts(&self) -> usize {
        self.report_attempts.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn reported_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.reported.lock().unwrap().iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids
    }

    pub fn reported(&self) -> Vec<Candidate> {
        self.reported.lock().unwrap().clone()
    }
}

#[async_trait]
impl InventoryClient for MockInventory {
    async fn require(&self, num: usize) -> Result<Vec<Candidate>> {
        self.require_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.require_status {
            return Err(MaintainerError::UnexpectedStatus {
                status,
                body: "mock failure".to_string(),
            });
        }
        Ok(self.batch.iter().take(num).cloned().collect())
    }

    async fn report(&self, candidate: &Candidate) -> Result<()> {
        self.report_attempts.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.report_delay.is_zero() {
            tokio::time::sleep(self.report_delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_reports {
            return Err(MaintainerError::UnexpectedStatus {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }
        self.reported.lock().unwrap().push(candidate.clone());
        Ok(())
    }
}

/// Prober whose verdict is decided by a closure
pub struct FnProber<F> {
    verdict: F,
    delay: Duration,
    probes: AtomicUsize,
}

impl<F> FnProber<F>
where
    F: Fn(&Candidate) -> Result<()> + Send + Sync,
{
    pub fn new(verdict: F) -> Self {
        Self {
            verdict,
            delay: Duration::ZERO,
            probes: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<F> Prober for FnProber<F>
where
    F: Fn(&Candidate) -> Result<()> + Send + Sync,
{
    async fn probe(&self, candidate: &Candidate) -> Result<()> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.verdict)(candidate)
    }
}

/// In-memory proxy table
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<ProxyRecord>>,
    sweeps: AtomicUsize,
    fail: bool,
}

impl MemoryStore {
    pub fn with_err_times(err_times: &[i32]) -> Self {
        let records = err_times
            .iter()
            .enumerate()
            .map(|(i, &err_times)| ProxyRecord {
                id: i as i32 + 1,
                address: format!("10.0.1.{}:3128", i + 1),
                provider: "alpha".to_string(),
                dial_type: "http".to_string(),
                err_times,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .collect();

        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn remaining_err_times(&self) -> Vec<i32> {
        self.records.lock().unwrap().iter().map(|r| r.err_times).collect()
    }

    pub fn sweeps(&self) -> usize {
        self.sweeps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProxyStore for MemoryStore {
    async fn delete_exceeding(&self, max_err: i32) -> Result<Vec<ProxyRecord>> {
        self.sweeps.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(MaintainerError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut records = self.records.lock().unwrap();
        let (dead, alive): (Vec<_>, Vec<_>) =
            records.drain(..).partition(|r| r.is_dead(max_err));
        *records = alive;
        Ok(dead)
    }
}
