//! Top-level facade crate for Disgordian.
//!
//! Re-exports the wire protocol and the gateway session library so users can depend on a single crate.

pub mod core {
    pub use disgordian_core::*;
}

pub mod gateway {
    pub use disgordian_gateway::*;
}
