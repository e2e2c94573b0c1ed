//! Dispatch event routing.
//!
//! Decoded Dispatch envelopes become `DispatchEvent`s and are fanned out to
//! registered `EventHandler`s, each on its own task.

pub mod event;
pub mod router;

pub use event::DispatchEvent;
pub use router::{EventHandler, EventRouter};
