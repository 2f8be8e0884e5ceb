//! Pxier Maintainer - proxy pool upkeep
//!
//! Keeps a proxy inventory healthy by running two periodic jobs.
//!
//! ## Features
//!
//! - Fetch-validate cycle: pulls mixed-provider candidates from the inventory,
//!   probes each through its own HTTP CONNECT or SOCKS5 tunnel, and reports
//!   failures back under a bounded concurrency budget
//! - Reaper: deletes persisted proxies whose error count reached the ceiling
//! - Environment-driven configuration and structured logging

pub mod config;
pub mod database;
pub mod error;
pub mod inventory;
pub mod models;
pub mod proxy;
pub mod repository;
pub mod services;

pub use config::Config;
pub use database::Database;
pub use error::{MaintainerError, Result};
