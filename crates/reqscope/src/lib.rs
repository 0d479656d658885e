//! Top-level facade crate for reqscope.
//!
//! Re-exports the instrumentation core and the server library so users can depend on a single crate.

pub mod core {
    pub use reqscope_core::*;
}

pub mod server {
    pub use reqscope_server::*;
}
