//! Dialing and probing through candidate proxies
//!
//! This module provides:
//! - HTTP CONNECT and SOCKS5 tunnels through a candidate
//! - The connectivity probe run by every validation task

pub mod probe;
pub mod transport;

#[cfg(test)]
pub(crate) mod fakes;

pub use probe::{Prober, ProxyProber, DEFAULT_PROBE_TIMEOUT};
pub use transport::{ProxyEndpoint, ProxyTransport};
