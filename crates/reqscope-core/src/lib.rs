//! reqscope core: label-keyed metric vectors, the pull-based exposition
//! renderer, the request instrumentation middleware, and the span-tree
//! tracing model.
//!
//! This crate defines the data structures and contracts shared by the server
//! and by anything that wants to instrument its own handlers. It intentionally
//! carries no transport or runtime dependencies so it can be reused in
//! multiple contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Instrumentation sits on the request path; all fallible paths must surface
//! as `ScopeError`/`Result` (setup) or be logged and dropped (runtime).

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod exposition;
pub mod instrument;
pub mod labels;
pub mod metrics;
pub mod trace;

/// Shared result type.
pub use error::{Result, ScopeError};
