//! Client side of the pxier inventory service

pub mod client;

pub use client::{InventoryClient, PxierClient, DEFAULT_REQUEST_TIMEOUT};
