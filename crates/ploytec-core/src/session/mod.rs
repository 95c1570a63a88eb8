//! Session module.
//!
//! The session controller orchestrates the lifecycle state machine against
//! the extension manager's asynchronous callbacks, and supervises the
//! hardware connection (retry loop while disconnected, stats polling while
//! connected).

pub mod config;
pub mod connection;
pub mod controller;

pub use config::SessionConfig;
pub use controller::{CallbackSink, SessionCommand, SessionController};
