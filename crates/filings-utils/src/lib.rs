//! Shared utilities for filings-rs
//!
//! This crate provides functionality used across the filings-rs workspace:
//! logging setup and the clock abstraction that lets cache expiry and
//! rate-limit cooldowns be driven deterministically in tests.

pub mod clock;
pub mod logging;

pub use clock::{Clock, ManualClock, SystemClock};
pub use logging::{init_tracing, init_tracing_with_default};
