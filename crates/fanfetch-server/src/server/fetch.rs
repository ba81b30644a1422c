//! Batch fan-out.
//!
//! - [`worker`] - A single HTTP GET behind the [`worker::Fetcher`] seam.
//! - [`coordinator`] - Splits a batch into worker-budget sized chunks and
//!   aggregates (or fails fast on) their results.

pub mod coordinator;
pub mod worker;
