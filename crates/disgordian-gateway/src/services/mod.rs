//! Built-in event handlers.

pub mod channel;
pub mod log;

pub use channel::ChannelHandler;
pub use log::LogEventHandler;
