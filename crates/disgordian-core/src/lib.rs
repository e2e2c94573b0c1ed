//! Disgordian core: transport-agnostic gateway protocol primitives and errors.
//!
//! This crate defines the wire-level envelope, opcode set, handshake payloads
//! and the error surface shared by the gateway session and its tests. It
//! carries no transport or runtime dependencies.
//!
//! Panics, `unwrap`, and `expect` are compile-denied here. All fallible paths
//! surface as `DisgordianError`/`Result`, so a malformed frame from the peer
//! ends a session cleanly instead of aborting the process.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{DisgordianError, ErrorClass, Result};
