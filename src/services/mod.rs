//! Background services
//!
//! This module provides:
//! - The fetch-validate cycle and its report budget
//! - The dead-proxy reaper
//! - The scheduler running both on fixed periods

pub mod fetch_cycle;
pub mod reaper;
pub mod report_limiter;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod fakes;

pub use fetch_cycle::{FetchCycle, FetchCycleConfig, ValidationOutcome};
pub use reaper::Reaper;
pub use report_limiter::ReportLimiter;
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerHandle};
