//! HTTP service implementation.
//!
//! ## Structure
//!
//! - [`handler`] - HTTP entry point (`CollectService`) and its router.

pub mod handler;
