//! Disgordian gateway library entry.
//!
//! This crate wires the transport, session coordinator (handshake, pacemaker,
//! outbound dispatcher, inbound pump), event routing and built-in handlers
//! into a gateway client. It is consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod obs;
pub mod services;
pub mod session;
pub mod transport;
