//! reqscope server library entry.
//!
//! Wires the instrumentation core into an axum service: config loading, the
//! shared registry and tracer, background collectors, the queued span
//! exporter, the `/metrics` pull endpoint and the demo handlers. Consumed by
//! the binary (`main.rs`) and by integration tests.

pub mod adapter;
pub mod app_state;
pub mod collector;
pub mod config;
pub mod export;
pub mod handlers;
pub mod ops;
pub mod router;
pub mod synthetic;
