//! Server-side components of the `fanfetch` URL collection service.
//!
//! ## Submodules
//!
//! - [`config`] - CLI/environment configuration.
//! - [`gate`] - Process-wide admission control for concurrent batches.
//! - [`fetch`] - Fetch workers and the chunked batch coordinator.
//! - [`service`] - HTTP routing and request handling.
//! - [`telemetry`] - Tracing and metrics initialization (optional exporters).
//!
//! These components are wired together in the server's `main.rs`.

pub mod config;
pub mod fetch;
pub mod gate;
pub mod service;
pub mod telemetry;
