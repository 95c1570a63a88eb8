//! Hardware user-client boundary.
//!
//! The privileged driver exposes a user client with open/close, device info
//! strings, playback statistics and tunable transfer parameters. This module
//! defines the `UserClient` trait for that boundary, allowing different
//! implementations (platform glue, mock, in-process simulator).

pub mod mock;
pub mod sim;
pub mod stats;
pub mod traits;

pub use mock::{ClientCall, MockUserClient};
pub use sim::SimUserClient;
pub use stats::PlaybackStats;
pub use traits::{ClientError, UserClient};
